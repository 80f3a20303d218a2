use ledger_core::{
    constants::DEFAULT_MINING_REWARD, pow::count_leading_zero_nibbles, Address, KeyPair, Ledger,
    LedgerConfig, LedgerError, SharedLedger, Transaction,
};
use rand::Rng;
use std::sync::atomic::AtomicBool;

fn signed(from: &KeyPair, to: &Address, amount: u64) -> anyhow::Result<Transaction> {
    let mut tx = Transaction::new(from.address(), to.clone(), amount);
    tx.sign(from)?;
    Ok(tx)
}

#[test]
fn test_empty_ledger() -> anyhow::Result<()> {
    let ledger = Ledger::new(LedgerConfig::default().with_difficulty(2));
    assert_eq!(ledger.balance_of(&KeyPair::generate().address()), 0);
    assert!(ledger.is_valid());
    ledger.validate()?;
    Ok(())
}

#[test]
fn test_transfer_and_mine() -> anyhow::Result<()> {
    let mut ledger = Ledger::new(LedgerConfig::default().with_difficulty(2));
    let a = KeyPair::generate();
    let b = KeyPair::generate();

    ledger.add_transaction(signed(&a, &b.address(), 10)?)?;
    assert_eq!(ledger.pending_transactions().len(), 1);
    ledger.mine_pending_transactions(&a.address())?;

    assert_eq!(ledger.len(), 2);
    assert!(ledger.pending_transactions().is_empty());
    assert_eq!(ledger.balance_of(&a.address()), DEFAULT_MINING_REWARD as i128 - 10);
    assert_eq!(ledger.balance_of(&b.address()), 10);
    assert!(ledger.is_valid());
    Ok(())
}

#[test]
fn test_random_chain_stays_valid() -> anyhow::Result<()> {
    let difficulty = 2;
    let mut ledger = Ledger::new(LedgerConfig::default().with_difficulty(difficulty));
    let wallets: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
    let mut rng = rand::thread_rng();
    let mut expected = vec![0i128; wallets.len()];

    for round in 0..6 {
        for _ in 0..rng.gen_range(0..4) {
            let from = rng.gen_range(0..wallets.len());
            let to = rng.gen_range(0..wallets.len());
            let amount = rng.gen_range(1..50u64);
            ledger.add_transaction(signed(&wallets[from], &wallets[to].address(), amount)?)?;
            expected[from] -= amount as i128;
            expected[to] += amount as i128;
        }
        let miner = round % wallets.len();
        ledger.mine_pending_transactions(&wallets[miner].address())?;
        expected[miner] += DEFAULT_MINING_REWARD as i128;
    }

    assert_eq!(ledger.len(), 7);
    for block in &ledger.chain()[1..] {
        assert!(count_leading_zero_nibbles(&block.hash) >= difficulty);
        assert_eq!(block.hash, block.compute_hash());
    }
    for (wallet, balance) in wallets.iter().zip(expected) {
        assert_eq!(ledger.balance_of(&wallet.address()), balance);
    }
    assert!(ledger.is_valid());
    Ok(())
}

#[test]
fn test_rejections_leave_pool_untouched() -> anyhow::Result<()> {
    let mut ledger = Ledger::new(LedgerConfig::default().with_difficulty(1));
    let a = KeyPair::generate();
    let mallory = KeyPair::generate();

    let mut forged = Transaction::new(a.address(), mallory.address(), 10);
    assert_eq!(forged.sign(&mallory), Err(LedgerError::Authorization));
    assert_eq!(ledger.add_transaction(forged), Err(LedgerError::MissingSignature));

    let zero = signed(&a, &mallory.address(), 0)?;
    assert!(matches!(ledger.add_transaction(zero), Err(LedgerError::Validation(_))));

    assert!(ledger.pending_transactions().is_empty());
    Ok(())
}

#[test]
fn test_cancelled_mining_then_retry() -> anyhow::Result<()> {
    let mut ledger = Ledger::new(LedgerConfig::default().with_difficulty(2));
    let a = KeyPair::generate();
    ledger.add_transaction(signed(&a, &Address::from("bob"), 5)?)?;

    let cancel = AtomicBool::new(true);
    assert!(ledger
        .mine_pending_transactions_cancellable(&a.address(), &cancel)?
        .is_none());
    assert_eq!(ledger.len(), 1);

    let cancel = AtomicBool::new(false);
    let block = ledger
        .mine_pending_transactions_cancellable(&a.address(), &cancel)?
        .expect("search was not cancelled");
    assert_eq!(block.txs.len(), 2);
    assert!(ledger.pending_transactions().is_empty());
    assert!(ledger.is_valid());
    Ok(())
}

#[test]
fn test_shared_ledger_round_trip() -> anyhow::Result<()> {
    let shared = SharedLedger::new(LedgerConfig::default().with_difficulty(1));
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    shared.mine_pending_transactions(&a.address())?;
    shared.add_transaction(signed(&a, &b.address(), 40)?)?;
    shared.mine_pending_transactions(&b.address())?;

    assert_eq!(shared.balance_of(&a.address()), DEFAULT_MINING_REWARD as i128 - 40);
    assert_eq!(shared.balance_of(&b.address()), DEFAULT_MINING_REWARD as i128 + 40);
    shared.validate()?;
    Ok(())
}

#[test]
fn test_imported_chain_with_forged_amount_is_rejected() -> anyhow::Result<()> {
    let config = LedgerConfig::default().with_difficulty(2);
    let mut ledger = Ledger::new(config.clone());
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    ledger.add_transaction(signed(&a, &b.address(), 10)?)?;
    ledger.mine_pending_transactions(&a.address())?;

    let untouched = Ledger::from_blocks(config.clone(), ledger.chain().to_vec());
    assert!(untouched.is_valid());

    let mut blocks = ledger.chain().to_vec();
    blocks[1].txs[0].amount = 1;
    let forged = Ledger::from_blocks(config, blocks);
    assert!(!forged.is_valid());
    assert!(matches!(
        forged.validate(),
        Err(LedgerError::Integrity { index: 1, .. })
    ));
    Ok(())
}
