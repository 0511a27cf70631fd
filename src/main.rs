use std::sync::Arc;

use clap::Parser;

use ignition::{
    config::Config,
    core::{DispatchResult, ExitStatus, ServiceContainer},
    handler::welcome,
    http::{
        emitter::StdoutEmitter,
        request::{CliRequest, Request},
    },
    logging,
    orchestration::Dispatcher,
    router::{HandlerRef, RouteTable},
};

#[derive(Parser)]
#[command(name = "ignition")]
#[command(about = "Run one request through the ignition dispatcher", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    conf: Option<String>,

    /// Route this path instead of the one built from the segments
    #[arg(long)]
    path: Option<String>,

    /// Path segments followed by `--name value` options
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn run(cli: Cli) -> DispatchResult<ExitStatus> {
    let config = match &cli.conf {
        Some(path) => Config::load_from_yaml(path)?,
        None => Config::default(),
    };
    logging::init_logger(&config.log)?;

    let mut builder = ServiceContainer::builder_from_config(config.clone())?
        .controller(welcome::descriptor())
        .emitter(Arc::new(StdoutEmitter));

    if config.routes.is_empty() {
        log::debug!("No routes configured, serving the welcome page");
        let mut table = RouteTable::from_config(&config)?;
        table.add("/", HandlerRef::named(welcome::CONTROLLER_NAME, "index"))?;
        table.add(
            "/echo/{*words}",
            HandlerRef::named(welcome::CONTROLLER_NAME, "echo"),
        )?;
        builder = builder.routes(Arc::new(table));
    }

    let container = Arc::new(builder.build());
    let request = Request::from(CliRequest::from_args(cli.args));

    let mut dispatcher = Dispatcher::new(container, request);
    if let Some(path) = cli.path {
        dispatcher.set_path(path);
    }
    dispatcher.run(None)
}

fn main() {
    let cli = Cli::parse();

    let status = match run(cli) {
        Ok(status) => status,
        Err(e) => {
            log::error!("Request failed: {e}");
            eprintln!("ignition: {e}");
            ExitStatus::Error
        }
    };

    std::process::exit(status.code());
}
