use clap::Parser as _;
use stun_external_ip::cli::{self, Args};
use stun_external_ip::perform_binding_transaction;

fn main() -> anyhow::Result<()> {
    cli::init_tracing();
    let args = Args::parse();

    for server in args.servers() {
        let result = perform_binding_transaction(&server, args.timeout());

        println!("{}", cli::report(&server, &result));
    }

    Ok(())
}
