use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use offer_binding::{
    ethereum::{events, utils},
    offer, BindingConfig, ContractClass, ContractInstance, RpcTransport, Transport, TxParams,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", BindingConfig::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match BindingConfig::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = BindingConfig::load_or_default(config_path).await;

    if let Some(network) = matches.get_one::<String>("network") {
        config.network = Some(network.clone());
    }
    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(artifact) = matches.get_one::<String>("artifact") {
        config.artifact = Some(artifact.into());
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.synchronization_timeout = *timeout;
    }
    if matches.get_flag("next-gen") {
        config.next_gen = true;
    }

    if let Err(e) = run(&config, &matches).await {
        let message = utils::interpret_rpc_error(&e.to_string());
        error!("{}", message);
        return Err(e);
    }

    Ok(())
}

fn cli() -> Command {
    let args = Arg::new("args")
        .value_name("ARG")
        .num_args(0..)
        .help("Arguments, parsed as JSON when possible");
    let tx_options = [
        Arg::new("from").long("from").value_name("ADDRESS").help("Sender account"),
        Arg::new("value").long("value").value_name("WEI").help("Wei to send along"),
        Arg::new("gas").long("gas").value_name("GAS").help("Gas limit"),
        Arg::new("gas-price").long("gas-price").value_name("WEI").help("Gas price"),
    ];
    let address = Arg::new("address")
        .short('a')
        .long("address")
        .value_name("ADDRESS")
        .help("Contract address; the network's recorded address when omitted");

    Command::new("offer-binding")
        .version("0.1.0")
        .about("Deploy and drive Offer contracts over JSON-RPC")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .help("Artifact network id to bind (detected from the node when omitted)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("artifact")
                .long("artifact")
                .value_name("FILE")
                .help("Artifact JSON to use instead of the embedded Offer artifact"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64))
                .help("Milliseconds to wait for a transaction to be mined"),
        )
        .arg(
            Arg::new("next-gen")
                .long("next-gen")
                .help("Print receipts and decoded events instead of bare hashes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("networks").about("List the artifact's networks"))
        .subcommand(Command::new("functions").about("List the contract's functions"))
        .subcommand(
            Command::new("call")
                .about("Invoke a constant function with eth_call")
                .arg(Arg::new("function").required(true))
                .arg(args.clone())
                .arg(address.clone())
                .arg(tx_options[0].clone()),
        )
        .subcommand(
            Command::new("send")
                .about("Submit a transaction and wait for it to be mined")
                .arg(Arg::new("function").required(true))
                .arg(args.clone())
                .arg(address)
                .args(tx_options.clone()),
        )
        .subcommand(
            Command::new("deploy")
                .about("Deploy a new instance with the given constructor arguments")
                .arg(args)
                .arg(
                    Arg::new("link")
                        .long("link")
                        .value_name("NAME=ADDRESS")
                        .action(ArgAction::Append)
                        .help("Library address to link into the binary"),
                )
                .args(tx_options),
        )
        .subcommand(
            Command::new("decode-receipt")
                .about("Fetch a receipt and decode the contract's events in it")
                .arg(Arg::new("tx").required(true).value_name("HASH")),
        )
}

async fn run(config: &BindingConfig, matches: &ArgMatches) -> Result<()> {
    let mut class = offer::class(config).await?;

    match matches.subcommand() {
        Some(("networks", _)) => {
            for id in class.networks() {
                let marker = if class.network_id() == Some(id.as_str()) { "*" } else { " " };
                println!("{} {}", marker, id);
            }
            return Ok(());
        }
        Some(("functions", _)) => {
            for function in class.network().functions() {
                let mutability = if function.constant() {
                    "constant"
                } else if function.payable() {
                    "payable"
                } else {
                    "nonpayable"
                };
                println!("{} [{}]", function.signature(), mutability);
            }
            return Ok(());
        }
        _ => {}
    }

    let transport: Arc<dyn Transport> = Arc::new(RpcTransport::from_config(config)?);
    class.set_provider(transport.clone());
    if class.network_id().is_none() {
        class.detect_network().await?;
    }
    info!(
        "Bound {} to network {} via {}",
        class.name(),
        class.network_id().unwrap_or("?"),
        config.rpc_url
    );

    match matches.subcommand() {
        Some(("call", sub)) => {
            let instance = instance(&class, sub)?;
            let function = required(sub, "function")?;
            let output = instance
                .call(function, &json_args(sub), &tx_options(sub)?)
                .await?;
            print_json(&output)?;
        }
        Some(("send", sub)) => {
            let instance = instance(&class, sub)?;
            let function = required(sub, "function")?;
            let confirmation = instance
                .transact(function, &json_args(sub), &tx_options(sub)?)
                .await?;
            print_json(&confirmation)?;
        }
        Some(("deploy", sub)) => {
            if let Some(links) = sub.get_many::<String>("link") {
                for link in links {
                    let (name, address) = link
                        .split_once('=')
                        .ok_or_else(|| anyhow!("--link expects NAME=ADDRESS, got '{}'", link))?;
                    class.link(name, utils::validate_address(address)?);
                }
            }
            let instance = class.deploy(&json_args(sub), &tx_options(sub)?).await?;
            println!("{}", instance.address());
        }
        Some(("decode-receipt", sub)) => {
            let tx = required(sub, "tx")?
                .parse()
                .context("Transaction hash must be 32 bytes of hex")?;
            let receipt = transport
                .transaction_receipt(tx)
                .await?
                .ok_or_else(|| anyhow!("No receipt for {} yet", tx))?;
            print_json(&events::decode_logs(class.events(), &receipt.logs))?;
        }
        _ => return Err(anyhow!("No command given; see --help")),
    }

    Ok(())
}

fn instance(class: &ContractClass, matches: &ArgMatches) -> Result<ContractInstance> {
    let instance = match matches.get_one::<String>("address") {
        Some(address) => class.at(address)?,
        None => class.deployed()?,
    };
    Ok(instance)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("Missing <{}>", name))
}

/// Bare words that are not valid JSON are passed as strings
fn json_args(matches: &ArgMatches) -> Vec<Value> {
    matches
        .get_many::<String>("args")
        .map(|values| {
            values
                .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())))
                .collect()
        })
        .unwrap_or_default()
}

fn tx_options(matches: &ArgMatches) -> Result<TxParams> {
    let mut options = serde_json::Map::new();
    for (flag, key) in [("from", "from"), ("value", "value"), ("gas", "gas"), ("gas-price", "gasPrice")] {
        if let Ok(Some(raw)) = matches.try_get_one::<String>(flag) {
            options.insert(key.to_string(), Value::String(raw.clone()));
        }
    }
    Ok(TxParams::from_json(&Value::Object(options))?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
