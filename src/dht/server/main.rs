use std::{env, sync::Arc, time::Duration};

use chordring::{
    config::NodeConfig,
    dht::{DhtControl, Node},
    error::{Error, Result},
};
use log::info;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "Commands: create | join <addr> | put <key> <value> | get <key> | \
delete <key> | ping <addr> | quit | forcequit | exit";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let port = args
        .get(1)
        .ok_or(Error::Parse("missing port argument".into()))?;
    let bootstrap = args.get(2);

    env_logger::init();

    let mut config = NodeConfig::default();
    if let Ok(interval) = env::var("MAINTAIN_INTERVAL_MS") {
        let millis = interval
            .parse::<u64>()
            .map_err(|_| Error::Parse(format!("invalid MAINTAIN_INTERVAL_MS {}", interval)))?;
        config = config.with_maintain_interval(Duration::from_millis(millis));
    }

    let hostname = env::var("NODE_HOSTNAME").unwrap_or("127.0.0.1".to_owned());
    let addr = format!("{}:{}", hostname, port);

    info!("Initializing node on {}", addr);
    let node = Arc::new(Node::new(addr, config));
    if !DhtControl::run(&node).await {
        return Err(Error::Initialization(format!(
            "unable to serve on port {}",
            port
        )));
    }
    println!("Node #{} listening on {}", node.id(), node.addr());

    if let Some(bootstrap) = bootstrap {
        let joined = DhtControl::join(&node, bootstrap).await;
        println!("join {}: {}", bootstrap, outcome(joined));
    }

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let input = match lines.next_line().await? {
            Some(input) => input,
            None => break,
        };
        let words = input.split_whitespace().collect::<Vec<&str>>();
        let operation = match words.first() {
            Some(operation) => operation.to_uppercase(),
            None => continue,
        };

        match (&operation[..], &words[1..]) {
            ("CREATE", []) => println!("create: {}", outcome(DhtControl::create(&node).await)),
            ("JOIN", [addr]) => println!("join: {}", outcome(DhtControl::join(&node, addr).await)),
            ("PUT", [key, value]) => {
                println!("put: {}", outcome(DhtControl::put(&node, key, value).await))
            }
            ("GET", [key]) => match DhtControl::get(&node, key).await {
                Some(value) => println!("Value is: {}", value),
                None => println!("Key not present"),
            },
            ("DELETE", [key]) => {
                println!("delete: {}", outcome(DhtControl::delete(&node, key).await))
            }
            ("PING", [addr]) => println!("ping: {}", outcome(DhtControl::ping(&node, addr).await)),
            ("QUIT", []) => {
                println!("quit: {}", outcome(DhtControl::quit(&node).await));
                return Ok(());
            }
            ("FORCEQUIT", []) => {
                DhtControl::force_quit(&node).await;
                return Ok(());
            }
            ("EXIT", []) => break,
            _ => println!("invalid entry. {}", HELP),
        }
    }

    if node.is_running() {
        DhtControl::quit(&node).await;
    }
    Ok(())
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "failed"
    }
}
