//! Single-node behaviour: admission, mining, cancellation and fork choice.

mod common;

use std::time::Duration;
use common::{easy_curve, eventually, mine_on, offline_node, steep_curve, vote};
use votechain::ledger::Block;
use votechain::node::BlockOutcome;
use votechain::utils::VoteChainError;

#[tokio::test]
async fn vote_is_mined_and_second_vote_rejected() {
    let node = offline_node(easy_curve());

    let tx = node.cast_vote("Alice").await.unwrap();
    assert!(node.has_pending(&tx.id));
    assert!(matches!(node.cast_vote("Bob").await, Err(VoteChainError::DuplicateVote { .. })));

    let block = node.mine_pending().await.unwrap().expect("a block");
    assert_eq!(block.index, 1);
    assert_eq!(block.transactions, vec![tx.clone()]);
    assert_eq!(node.chain_len(), 2);
    assert_eq!(node.pending_count(), 0);

    // still a double vote once the first one is on chain
    assert!(matches!(node.cast_vote("Bob").await, Err(VoteChainError::DuplicateVote { .. })));
    assert!(matches!(
        node.submit_transaction(tx).await,
        Err(VoteChainError::DuplicateVote { .. })
    ));

    let tally = node.vote_results();
    assert_eq!(tally.results.get("Alice"), Some(&1));
    assert_eq!(tally.total_votes, 1);
    assert_eq!(tally.chain_length, 2);

    // nothing left to mine
    assert!(node.mine_pending().await.unwrap().is_none());
    assert!(!node.request_mine());
}

#[tokio::test]
async fn tampered_and_repeated_transactions_are_dropped() {
    let node = offline_node(easy_curve());

    let mut forged = vote("Alice");
    forged.vote_data = "Mallory".into();
    assert!(matches!(
        node.submit_transaction(forged).await,
        Err(VoteChainError::BadSignature { .. })
    ));

    let mut blank = vote("Alice");
    blank.voter_id.clear();
    assert!(matches!(
        node.submit_transaction(blank).await,
        Err(VoteChainError::MalformedTransaction(_))
    ));

    let tx = vote("Carol");
    assert!(node.on_foreign_transaction(tx.clone(), "127.0.0.1:9").await.unwrap());
    assert!(!node.on_foreign_transaction(tx, "127.0.0.1:9").await.unwrap());
    assert_eq!(node.pending_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn foreign_block_cancels_local_mining() {
    let node = offline_node(steep_curve());
    let own = node.cast_vote("Alice").await.unwrap();

    let miner = node.clone();
    let task = tokio::spawn(async move { miner.mine_pending().await });
    let n = &node;
    assert!(eventually(Duration::from_secs(5), move || async move { n.is_mining() }).await);

    let foreign = mine_on(steep_curve(), &node.chain(), vec![vote("Bob")], "127.0.0.1:9", 11);
    let outcome = node.on_foreign_block(foreign.clone(), "127.0.0.1:9").await.unwrap();
    assert_eq!(outcome, BlockOutcome::Appended);

    let mined = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert!(matches!(mined, Err(VoteChainError::StaleMiningWork)));
    assert!(!node.is_mining());
    assert_eq!(node.tip_hash(), foreign.hash());
    // our vote was not in the foreign block, so it waits for the next attempt
    assert!(node.has_pending(&own.id));

    // the same block again is a duplicate
    assert_eq!(node.on_foreign_block(foreign, "127.0.0.1:9").await.unwrap(), BlockOutcome::Duplicate);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn adopting_a_longer_chain_cancels_local_mining() {
    let node = offline_node(steep_curve());
    node.cast_vote("Alice").await.unwrap();

    let miner = node.clone();
    let task = tokio::spawn(async move { miner.mine_pending().await });
    let n = &node;
    assert!(eventually(Duration::from_secs(5), move || async move { n.is_mining() }).await);

    let mut rival = vec![Block::genesis()];
    rival.push(mine_on(steep_curve(), &rival, vec![vote("Bob")], "rival", 11));
    rival.push(mine_on(steep_curve(), &rival, vec![vote("Carol")], "rival", 11));
    assert!(node.adopt_chain(rival.clone(), Some("rival")).await.unwrap());

    let mined = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert!(matches!(mined, Err(VoteChainError::StaleMiningWork)));
    assert_eq!(node.chain_len(), 3);
    assert_eq!(node.tip_hash(), rival[2].hash());
}

#[tokio::test]
async fn fork_choice_prefers_length_then_stake() {
    let node = offline_node(easy_curve());
    node.cast_vote("Alice").await.unwrap();
    node.mine_pending().await.unwrap().expect("a block");
    let incumbent_tip = node.tip_hash();

    // same length, same stake: keep ours
    let mut tie = vec![Block::genesis()];
    tie.push(mine_on(easy_curve(), &tie, vec![vote("Bob")], "rival", 0));
    assert!(!node.adopt_chain(tie, Some("rival")).await.unwrap());
    assert_eq!(node.tip_hash(), incumbent_tip);

    // same length, more stake: adopt
    let mut heavier = vec![Block::genesis()];
    heavier.push(mine_on(easy_curve(), &heavier, vec![vote("Bob")], "rival", 5));
    assert!(node.adopt_chain(heavier.clone(), Some("rival")).await.unwrap());
    assert_eq!(node.tip_hash(), heavier[1].hash());
    assert_eq!(node.vote_results().results.get("Bob"), Some(&1));

    // longer beats heavier
    let mut longer = vec![Block::genesis()];
    longer.push(mine_on(easy_curve(), &longer, vec![vote("Carol")], "other", 0));
    longer.push(mine_on(easy_curve(), &longer, vec![vote("Dave")], "other", 0));
    assert!(node.adopt_chain(longer, Some("other")).await.unwrap());
    assert_eq!(node.chain_len(), 3);
    assert_eq!(node.chain_info().total_stake, 0);
}

#[tokio::test]
async fn invalid_competing_chain_is_refused() {
    let node = offline_node(easy_curve());
    let mut bad = vec![Block::genesis()];
    bad.push(mine_on(easy_curve(), &bad, vec![vote("Bob")], "rival", 0));
    bad.push(mine_on(easy_curve(), &bad, vec![vote("Carol")], "rival", 0));
    bad[1].transactions[0].vote_data = "Mallory".into();

    let err = node.adopt_chain(bad, Some("rival")).await.unwrap_err();
    assert!(matches!(err, VoteChainError::ChainValidationFailure { index: 1, .. }));
    assert_eq!(node.chain_len(), 1);
}

#[tokio::test]
async fn rejected_copy_does_not_shadow_the_genuine_block() {
    let node = offline_node(easy_curve());
    let genuine = mine_on(easy_curve(), &node.chain(), vec![vote("Bob")], "127.0.0.1:9", 0);

    // the signature is outside the block hash, so both copies share one key
    let mut forged = genuine.clone();
    forged.transactions[0].signature = vote("Bob").signature;
    assert_eq!(forged.hash(), genuine.hash());

    let err = node.on_foreign_block(forged, "127.0.0.1:9").await.unwrap_err();
    assert!(matches!(err, VoteChainError::InvalidBlock { index: 1, .. }));
    assert_eq!(node.chain_len(), 1);

    let outcome = node.on_foreign_block(genuine.clone(), "127.0.0.1:9").await.unwrap();
    assert_eq!(outcome, BlockOutcome::Appended);
    assert_eq!(node.tip_hash(), genuine.hash());
}

#[tokio::test]
async fn rejected_copy_does_not_shadow_the_genuine_transaction() {
    let node = offline_node(easy_curve());
    let genuine = vote("Carol");
    let mut forged = genuine.clone();
    forged.signature = vote("Carol").signature;

    let err = node.on_foreign_transaction(forged, "127.0.0.1:9").await.unwrap_err();
    assert!(matches!(err, VoteChainError::BadSignature { .. }));
    assert!(!node.has_pending(&genuine.id));

    assert!(node.on_foreign_transaction(genuine.clone(), "127.0.0.1:9").await.unwrap());
    assert!(node.has_pending(&genuine.id));
}

#[tokio::test]
async fn fork_block_is_retried_after_a_failed_chain_fetch() {
    let node = offline_node(easy_curve());
    node.cast_vote("Alice").await.unwrap();
    node.mine_pending().await.unwrap().expect("a block");

    let rival = mine_on(easy_curve(), &[Block::genesis()], vec![vote("Bob")], "rival", 5);
    // nothing listens on port 1, so the chain request fails each time
    for _ in 0..2 {
        let err = node.on_foreign_block(rival.clone(), "127.0.0.1:1").await.unwrap_err();
        assert!(err.is_network(), "unexpected error: {err}");
    }
    assert_eq!(node.chain_len(), 2);
}
