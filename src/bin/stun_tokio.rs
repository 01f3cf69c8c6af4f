use anyhow::Context as _;
use clap::Parser as _;
use stun_external_ip::cli::{self, Args};
use stun_external_ip::perform_binding_transaction_async;
use tokio::task::JoinSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::init_tracing();
    let args = Args::parse();
    let timeout = args.timeout();

    let mut transactions = JoinSet::new();
    for (index, server) in args.servers().into_iter().enumerate() {
        transactions.spawn(async move {
            let result = perform_binding_transaction_async(&server, timeout).await;
            (index, cli::report(&server, &result))
        });
    }

    let mut lines = Vec::with_capacity(transactions.len());
    while let Some(joined) = transactions.join_next().await {
        lines.push(joined.context("Binding task panicked")?);
    }
    lines.sort_unstable_by_key(|(index, _)| *index);

    for (_, line) in lines {
        println!("{line}");
    }

    Ok(())
}
