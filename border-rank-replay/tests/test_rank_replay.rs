use anyhow::Result;
use border_rank_replay::{
    MemoryStore, OverflowPolicy, RankReplayBuffer, RankReplayConfig, RankReplayError,
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    thread,
};
use test_log::test;

#[derive(Debug, Clone, PartialEq)]
struct Transition {
    obs: Vec<f32>,
    reward: f32,
}

fn transition(id: usize) -> Transition {
    Transition {
        obs: vec![id as f32; 4],
        reward: id as f32 * 0.1,
    }
}

fn config() -> RankReplayConfig {
    RankReplayConfig::default()
        .max_size(1_000)
        .partition_num(10)
        .learn_start(100)
        .batch_size(16)
        .total_steps(5_000)
        .alpha(0.7)
        .beta_zero(0.5)
}

type Buffer = RankReplayBuffer<MemoryStore<Transition>>;

fn push(buffer: &mut Buffer, id: usize) -> Result<(), RankReplayError> {
    buffer.experience_store_mut().insert(id, transition(id));
    buffer.store_with_max_priority(id).map(|_| ())
}

#[test]
fn test_training_loop() -> Result<()> {
    let mut buffer = Buffer::build(&config(), MemoryStore::new())?;

    for id in 0..99 {
        push(&mut buffer, id)?;
    }
    assert!(matches!(
        buffer.sample(0),
        Err(RankReplayError::NotWarmedUp { .. })
    ));

    let mut next_id = 99;
    for step in 100..600 {
        if !buffer.is_full() {
            push(&mut buffer, next_id)?;
            next_id += 1;
        }

        let batch = buffer.sample(step)?;
        assert_eq!(batch.len(), 16);
        assert_eq!(batch.weights.iter().copied().fold(0.0, f64::max), 1.0);
        assert!(batch.weights.iter().all(|&w| w > 0.0 && w <= 1.0));

        // Distinct ranks resolve to distinct experiences
        let ids = batch.ids.iter().collect::<HashSet<_>>();
        assert_eq!(ids.len(), 16);
        for (id, tr) in batch.ids.iter().zip(batch.payloads.iter()) {
            assert_eq!(tr, &transition(*id));
        }

        let td_errors = batch
            .payloads
            .iter()
            .map(|tr| (tr.reward as f64 - 10.0) / 3.0)
            .collect::<Vec<_>>();
        let res = buffer.update_priority(&batch.ids, &td_errors)?;
        assert!(res.iter().all(Result::is_ok));
    }

    assert_eq!(buffer.record_size(), 599);
    assert_eq!(buffer.beta(5_000), 1.0);
    assert_eq!(buffer.beta(100), 0.5);
    Ok(())
}

#[test]
fn test_sampling_prefers_high_ranks() -> Result<()> {
    let config = config().batch_size(4).alpha(1.0);
    let mut buffer = Buffer::build(&config, MemoryStore::new())?;
    for id in 0..1_000 {
        buffer.experience_store_mut().insert(id, transition(id));
        buffer.store(id, id as f64)?;
    }

    let mut top_half = 0;
    for step in 0..200 {
        let batch = buffer.sample(100 + step)?;
        top_half += batch.ids.iter().filter(|&&id| id >= 500).count();
    }
    // Under uniform sampling this would be about half of the 800 samples
    assert!(top_half > 600, "top_half = {}", top_half);
    Ok(())
}

#[test]
fn test_evicting_buffer_keeps_sampling() -> Result<()> {
    let config = config().overflow(OverflowPolicy::EvictLowest);
    let mut buffer = Buffer::build(&config, MemoryStore::new())?;
    for id in 0..1_500 {
        buffer.experience_store_mut().insert(id, transition(id));
        if let Some(evicted) = buffer.store(id, (id % 100) as f64)? {
            buffer.experience_store_mut().remove(evicted.id());
        }
    }

    assert_eq!(buffer.record_size(), 1_000);
    assert_eq!(buffer.experience_store().len(), 1_000);
    let batch = buffer.sample(1_000)?;
    assert_eq!(batch.len(), 16);
    Ok(())
}

#[test]
fn test_shared_buffer() -> Result<()> {
    let buffer = Arc::new(Mutex::new(Buffer::build(&config(), MemoryStore::new())?));

    let producer = {
        let buffer = buffer.clone();
        thread::spawn(move || {
            for id in 0..500 {
                let mut buffer = buffer.lock().unwrap();
                push(&mut buffer, id).unwrap();
            }
        })
    };

    // Samples while the producer keeps storing
    let learner = {
        let buffer = buffer.clone();
        thread::spawn(move || {
            let mut n_batches = 0;
            let mut record_sizes = Vec::new();
            while n_batches < 50 {
                let mut buffer = buffer.lock().unwrap();
                let batch = match buffer.sample(100 + n_batches) {
                    Ok(batch) => batch,
                    Err(RankReplayError::NotWarmedUp { .. }) => {
                        drop(buffer);
                        thread::yield_now();
                        continue;
                    }
                    Err(e) => panic!("{}", e),
                };

                assert_eq!(batch.len(), 16);
                assert_eq!(batch.weights.iter().copied().fold(0.0, f64::max), 1.0);
                assert!(batch.weights.iter().all(|&w| w > 0.0 && w <= 1.0));
                assert_eq!(batch.ids.iter().collect::<HashSet<_>>().len(), 16);
                for (id, tr) in batch.ids.iter().zip(batch.payloads.iter()) {
                    assert_eq!(tr, &transition(*id));
                }

                let td_errors = vec![0.1; batch.len()];
                let res = buffer.update_priority(&batch.ids, &td_errors).unwrap();
                assert!(res.iter().all(Result::is_ok));
                record_sizes.push(buffer.record_size());
                n_batches += 1;

                drop(buffer);
                thread::yield_now();
            }
            record_sizes
        })
    };

    producer.join().unwrap();
    let record_sizes = learner.join().unwrap();

    assert_eq!(record_sizes.len(), 50);
    assert!(record_sizes.iter().all(|&n| (100..=500).contains(&n)));
    assert!(record_sizes.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(buffer.lock().unwrap().record_size(), 500);
    Ok(())
}
