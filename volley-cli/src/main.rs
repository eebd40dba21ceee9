use anyhow::{bail, Context};
use clap::Parser;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Body, Method, Request, Url};
use std::time::{Duration, SystemTime};
use tracing::info;
use volley::config::RunConfig;
use volley::report::{render_summary, write_records, DEFAULT_RECORDS_FILENAME};
use volley::workload::BoxError;

#[derive(Parser, Debug)]
#[command(
    name = "volley",
    about = "Concurrent HTTP benchmarker with built-in latency statistics"
)]
struct Args {
    /// Target URL
    #[arg(long)]
    url: String,

    /// HTTP method
    #[arg(long, default_value = "GET")]
    method: String,

    /// Request header as `name: value`; repeatable
    #[arg(long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Request body, sent verbatim (POST/PUT only)
    #[arg(long)]
    body: Option<String>,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 1)]
    conc: usize,

    /// Rounds per worker; ignored when --dur is set
    #[arg(long, default_value_t = 2)]
    round: u32,

    /// Wall-clock duration, e.g. `30s` (takes precedence over --round)
    #[arg(long, value_parser = humantime::parse_duration)]
    dur: Option<Duration>,

    /// Comma-separated concurrency groups, e.g. `1,30,50`; runs the benchmark
    /// once per listed concurrency
    #[arg(long = "conc-group")]
    conc_group: Option<String>,

    /// Records output file
    #[arg(long, default_value = DEFAULT_RECORDS_FILENAME)]
    out: String,

    /// Skip writing the records file
    #[arg(long)]
    no_out: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("volley={level}"))),
        )
        .init();

    let groups = concurrency_groups(&args)?;
    let method: Method = args
        .method
        .to_uppercase()
        .parse()
        .with_context(|| format!("invalid method {:?}", args.method))?;
    if args.body.is_some() && method != Method::POST && method != Method::PUT {
        bail!("--body is only sent for POST/PUT");
    }
    let url: Url = args
        .url
        .parse()
        .with_context(|| format!("invalid url {:?}", args.url))?;
    let headers = parse_headers(&args.headers)?;

    for concurrency in &groups {
        let prefix = if groups.len() > 1 {
            format!("conc{concurrency}_")
        } else {
            String::new()
        };

        let config = RunConfig {
            concurrency: *concurrency,
            rounds: args.round,
            duration: args.dur,
            ..RunConfig::default()
        };

        let builder = {
            let method = method.clone();
            let url = url.clone();
            let headers = headers.clone();
            let body = args.body.clone();
            move || -> Result<Request, BoxError> {
                let mut request = Request::new(method.clone(), url.clone());
                for (name, value) in &headers {
                    request.headers_mut().insert(name.clone(), value.clone());
                }
                if let Some(body) = &body {
                    *request.body_mut() = Some(Body::from(body.clone()));
                }
                Ok(request)
            }
        };

        println!(
            "Benchmark Time: {}",
            humantime::format_rfc3339_seconds(SystemTime::now())
        );
        let report = volley::benchmark(builder)
            .with_config(config.clone())
            .await?;
        println!("{}", render_summary(&config, &report.summary));

        if !args.no_out {
            let path = format!("{prefix}{}", args.out);
            write_records(&path, &report.records)
                .with_context(|| format!("failed to write records to {path}"))?;
            info!("wrote {} records to {path}", report.records.len());
            println!("data file: {path}");
        }
    }

    Ok(())
}

fn concurrency_groups(args: &Args) -> anyhow::Result<Vec<usize>> {
    let Some(raw) = &args.conc_group else {
        return Ok(vec![args.conc]);
    };
    let mut groups = vec![];
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let concurrency: usize = token
            .parse()
            .with_context(|| format!("invalid concurrency {token:?} in --conc-group"))?;
        if concurrency >= 1 {
            groups.push(concurrency);
        }
    }
    if groups.is_empty() {
        bail!("--conc-group contains no usable concurrency values");
    }
    Ok(groups)
}

fn parse_headers(raw: &[String]) -> anyhow::Result<Vec<(HeaderName, HeaderValue)>> {
    let mut headers = Vec::with_capacity(raw.len());
    for header in raw {
        let Some((name, value)) = header.split_once(':') else {
            bail!("invalid header {header:?}, expected `name: value`");
        };
        let name: HeaderName = name
            .trim()
            .parse()
            .with_context(|| format!("invalid header name in {header:?}"))?;
        let value: HeaderValue = value
            .trim()
            .parse()
            .with_context(|| format!("invalid header value in {header:?}"))?;
        headers.push((name, value));
    }
    Ok(headers)
}
