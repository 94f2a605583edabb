use std::str::FromStr;
use structopt::StructOpt;

use lib_torcrawl::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    List,
    Tree,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<OutputFormat, String> {
        match raw.to_lowercase().as_str() {
            "list" => Ok(OutputFormat::List),
            "tree" => Ok(OutputFormat::Tree),
            _ => Err(format!("unknown format `{raw}`; options are list or tree")),
        }
    }
}

#[derive(StructOpt)]
#[structopt(
    name = "torcrawl",
    about = "Depth-bounded link crawler with first-class SOCKS5 (Tor) routing."
)]
pub struct Cli {
    #[structopt(short = "v", long)]
    pub verbose: bool,
    /// URL used to initiate the search; the root of the link tree.
    #[structopt(long)]
    pub url: Option<String>,
    #[structopt(flatten)]
    pub profile: Profile,
    /// How results are printed. Options are list or tree.
    #[structopt(short = "f", long, default_value = "list")]
    pub format: OutputFormat,
    /// Host used for the SOCKS5 proxy. Overrides SOCKS5_HOST.
    #[structopt(long)]
    pub socks5_host: Option<String>,
    /// Port used for the SOCKS5 proxy. Overrides SOCKS5_PORT.
    #[structopt(long)]
    pub socks5_port: Option<u16>,
    /// Disable the use of the SOCKS5 proxy and connect directly.
    #[structopt(long)]
    pub disable_socks5: bool,
    /// Behave as an HTTP API server; crawl flags are ignored.
    #[structopt(short = "s", long)]
    pub serve: bool,
    /// Host used for the torcrawl server.
    #[structopt(long, default_value = "127.0.0.1")]
    pub server_host: String,
    /// Port used for the torcrawl server.
    #[structopt(long, default_value = "8081")]
    pub server_port: u16,
    /// Download the results as a spreadsheet ({host}_depth_{n}.csv).
    #[structopt(short = "d", long)]
    pub download: bool,
}
