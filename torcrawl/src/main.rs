mod cli;

use ansi_term::Color::{Green, Red};
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;
use tokio_util::sync::CancellationToken;

use lib_torcrawl::{
    init_logger, log_panics, normalize_seed, serve, AppState, ClientOpts, Crawler, CsvSink, Env,
    Error, FanoutSink, HttpDownloader, LinkTree, PrintSink, Sink,
};

use crate::cli::{Cli, OutputFormat};

#[tokio::main]
async fn main() {
    let cli = Cli::from_args();

    match run(cli).await {
        Ok(Some(msg)) => {
            println!("{}: {msg}", Green.bold().paint("ok"));
            std::process::exit(0)
        }
        Ok(None) => std::process::exit(0),
        Err(err) => {
            println!("{}: {err}", Red.bold().paint("error"));
            std::process::exit(1)
        }
    }
}

async fn run(cli: Cli) -> Result<Option<String>, anyhow::Error> {
    let env = Env::load();
    init_logger(cli.verbose || env.debug);
    log_panics();

    let opts = ClientOpts {
        use_tor: env.use_tor && !cli.disable_socks5,
        socks_host: cli.socks5_host.clone().unwrap_or(env.socks5_host),
        socks_port: cli.socks5_port.unwrap_or(env.socks5_port),
        dial_timeout: Duration::from_secs_f64(cli.profile.dial_timeout),
        request_timeout: Duration::from_secs_f64(cli.profile.request_timeout),
        user_agent: cli.profile.user_agent().to_owned(),
        ..ClientOpts::default()
    };
    if opts.use_tor {
        log::info!(
            "routing through socks5 proxy at {}:{}",
            opts.socks_host,
            opts.socks_port,
        );
    }
    let downloader = Arc::new(HttpDownloader::new(&opts)?);

    // Server mode: every crawl flag is ignored.
    if cli.serve {
        let address = format!("{}:{}", cli.server_host, cli.server_port).parse()?;
        serve(address, AppState::new(downloader, cli.profile)).await?;
        return Ok(Some("server ended".to_owned()));
    }

    let Some(raw_url) = &cli.url else {
        return Err(anyhow::anyhow!("either --url or --serve is required"));
    };
    let seed = normalize_seed(raw_url)?;

    let crawler = Crawler::new(downloader, cli.profile.parameters())?;
    if crawler.seed([seed.as_str()]) == 0 {
        return Err(anyhow::anyhow!("seed was not accepted: {seed}"));
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("interrupt received; draining in-flight requests");
                cancel.cancel();
            }
        });
    }

    let spreadsheet = if cli.download {
        Some(Arc::new(CsvSink::create(CsvSink::file_name(
            &seed,
            cli.profile.depth,
        ))?))
    } else {
        None
    };

    log::info!(
        "starting crawl at {} (depth {}, {} workers)",
        seed,
        cli.profile.depth,
        cli.profile.workers,
    );

    let interrupted = match cli.format {
        OutputFormat::Tree => {
            let tree = Arc::new(LinkTree::new());
            let sink: Arc<dyn Sink> = match &spreadsheet {
                Some(spreadsheet) => Arc::new(FanoutSink::new(vec![
                    tree.clone() as Arc<dyn Sink>,
                    spreadsheet.clone() as Arc<dyn Sink>,
                ])),
                None => tree.clone(),
            };

            let interrupted = was_interrupted(crawler.run(cancel, sink).await)?;
            match tree.to_node(&seed) {
                Some(node) => lib_torcrawl::print_tree(&node),
                None => log::warn!("nothing was crawled for {seed}"),
            }
            interrupted
        }
        OutputFormat::List => {
            let print: Arc<dyn Sink> = Arc::new(PrintSink);
            let sink: Arc<dyn Sink> = match &spreadsheet {
                Some(spreadsheet) => Arc::new(FanoutSink::new(vec![
                    print,
                    spreadsheet.clone() as Arc<dyn Sink>,
                ])),
                None => print,
            };

            was_interrupted(crawler.run(cancel, sink).await)?
        }
    };

    if let Some(spreadsheet) = &spreadsheet {
        spreadsheet.finish()?;
    }

    if interrupted {
        Ok(Some("crawl interrupted".to_owned()))
    } else {
        Ok(Some("crawl complete".to_owned()))
    }
}

/// Cancellation is a clean ending for the CLI; everything else bubbles.
fn was_interrupted(outcome: Result<(), Error>) -> Result<bool, anyhow::Error> {
    match outcome {
        Ok(()) => Ok(false),
        Err(Error::Interrupted) => Ok(true),
        Err(err) => Err(err.into()),
    }
}
