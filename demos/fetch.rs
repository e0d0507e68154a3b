use std::time::Duration;

use structopt::StructOpt;

use pipehttp::engine::TcpEngine;
use pipehttp::middleware::LogMiddleware;
use pipehttp::prelude::*;
use pipehttp::uri::Uri;

#[derive(Debug, StructOpt)]
#[structopt(name = "fetch", about = "Perform one GET and print the response.")]
struct Opt {
    /// Target URL, e.g. http://example.com/
    url: String,
    #[structopt(long, default_value = "10")]
    timeout: u64,
    #[structopt(long, default_value = "0")]
    threads: usize,
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,
}

fn timeout(seconds: u64) -> Option<Duration> {
    if seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(seconds))
    }
}

fn main() {
    let opt = Opt::from_args();

    stderrlog::new()
        .module(module_path!())
        .module("pipehttp")
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Millisecond)
        .init()
        .unwrap();

    let uri = match Uri::parse(&opt.url) {
        Ok(uri) => uri,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let client = Client::new(TcpEngine::new(opt.threads, timeout(opt.timeout)))
        .with_middleware(LogMiddleware);

    match client.send(Request::get(uri)) {
        Ok(response) => {
            eprintln!("{}", response.line);
            for (name, value) in response.headers.iter() {
                eprintln!("{}: {}", name, value);
            }
            match response.text() {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("<body not printable: {}>", e),
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
