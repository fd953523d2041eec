//! Boot-test scenario for the rendezvous service.
//!
//! Each rank walks the classic exchange: init, query rank/size and the
//! length limits, publish a rank-derived entry, commit, hit the barrier,
//! then read back its own entry and its left neighbor's. Any mismatch or
//! error fails that rank.

use anyhow::{ensure, Context};
use muster_rendezvous::RendezvousService;
use muster_transport::{SimGroup, SimTransport, Transport};
use tokio::task::JoinSet;
use tracing::info;

/// Run the full scenario on one rank's transport endpoint.
pub async fn run_rank(transport: SimTransport) -> anyhow::Result<()> {
    let mut service = RendezvousService::new(transport);

    let spawned = service.init().await.context("init")?;
    ensure!(!spawned, "no process here was spawned dynamically");

    let size = service.size().context("size")?;
    let rank = service.rank().context("rank")?;
    let name_max = service.name_length_max().context("name_length_max")?;
    let key_max = service.key_length_max().context("key_length_max")?;
    let value_max = service.value_length_max().context("value_length_max")?;
    let ns = service.kvs_my_name().context("kvs_my_name")?.to_owned();
    ensure!(ns.len() < name_max, "namespace name exceeds its own limit");

    let own_key = format!("key-from-{rank}");
    let own_value = format!("val-from-{rank}");
    ensure!(own_key.len() < key_max, "scenario key exceeds the limit");
    ensure!(own_value.len() < value_max, "scenario value exceeds the limit");

    service.put(&ns, &own_key, &own_value).context("put")?;
    service.commit(&ns).context("commit")?;
    service.barrier().await.context("barrier")?;

    let read_back = service.get(&ns, &own_key, value_max).context("get own key")?;
    ensure!(
        read_back == own_value,
        "own entry came back as {read_back:?}"
    );

    let neighbor = (size + rank - 1) % size;
    let neighbor_key = format!("key-from-{neighbor}");
    let neighbor_value = service
        .get(&ns, &neighbor_key, value_max)
        .context("get neighbor key")?;
    ensure!(
        neighbor_value == format!("val-from-{neighbor}"),
        "neighbor entry came back as {neighbor_value:?}"
    );

    service.finalize().await.context("finalize")?;
    info!(rank, "scenario complete");
    Ok(())
}

/// Run the scenario across `ranks` simulated processes; returns per-rank
/// outcomes indexed by rank.
pub async fn run_group(ranks: usize) -> Vec<anyhow::Result<()>> {
    let mut tasks = JoinSet::new();
    for transport in SimGroup::new(ranks) {
        let rank = transport.self_rank();
        tasks.spawn(async move { (rank, run_rank(transport).await) });
    }

    let mut outcomes: Vec<anyhow::Result<()>> = (0..ranks).map(|_| Ok(())).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((rank, outcome)) => outcomes[rank] = outcome,
            Err(join_error) => {
                // A panicked rank has no slot to blame; surface it on 0.
                outcomes[0] = Err(anyhow::anyhow!("rank task panicked: {join_error}"));
            }
        }
    }
    outcomes
}
