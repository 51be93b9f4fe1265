//! 按拓扑描述文件运行一次发送
//!
//! 读取 topology.json，从 `--from` 节点向 `--to` 地址发送一条聊天消息，
//! 打印每个收件箱收到的内容。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use stacksim_rs::addr::{NetworkAddress, Port};
use stacksim_rs::topo::chat::{CHAT_PORT, CLIENT_PORT};
use stacksim_rs::topo::{ChatOpts, TopologySpec, build, chat_pipeline};
use stacksim_rs::trace::TraceLog;

#[derive(Debug, Parser)]
#[command(name = "topology_sim", about = "Send one message across a topology.json")]
struct Args {
    /// Path to topology.json
    #[arg(long)]
    topology: PathBuf,
    /// Sending node name
    #[arg(long)]
    from: String,
    /// Destination network address
    #[arg(long)]
    to: String,
    #[arg(long)]
    message: String,
    /// Sender name put in front of the message (defaults to the node name)
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value_t = 64)]
    ttl: u8,
    #[arg(long, default_value_t = 512)]
    mss: usize,
    #[arg(long, default_value_t = CLIENT_PORT.value())]
    src_port: u16,
    #[arg(long, default_value_t = CHAT_PORT.value())]
    dst_port: u16,
    /// Output trace JSON file
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

fn run(args: &Args) -> Result<(), String> {
    let raw = fs::read_to_string(&args.topology)
        .map_err(|e| format!("read {}: {e}", args.topology.display()))?;
    let spec: TopologySpec =
        serde_json::from_str(&raw).map_err(|e| format!("parse {}: {e}", args.topology.display()))?;

    let mut built = build(&spec).map_err(|e| e.to_string())?;
    if args.trace_json.is_some() {
        built.net.trace = Some(TraceLog::new());
        built.net.emit_trace_meta();
    }

    let from = built.node(&args.from).map_err(|e| e.to_string())?;
    let destination = args
        .to
        .parse::<NetworkAddress>()
        .map_err(|e| format!("--to {}: {e}", args.to))?;
    let source = built
        .net
        .node(from)
        .map_err(|e| e.to_string())?
        .base()
        .interfaces()
        .first()
        .map(|i| i.address)
        .ok_or_else(|| format!("node {} has no interfaces", args.from))?;

    let opts = ChatOpts {
        ttl: args.ttl,
        mss: args.mss,
        ..ChatOpts::default()
    };
    let user = args.name.as_deref().unwrap_or(&args.from);
    let pipeline = chat_pipeline(
        user,
        source,
        destination,
        Port::new(args.src_port),
        Port::new(args.dst_port),
        &opts,
    )
    .map_err(|e| e.to_string())?;

    let sent = built.net.send_to(from, pipeline, args.message.as_bytes());

    let mut names: Vec<&String> = built.inboxes.keys().collect();
    names.sort();
    for name in names {
        if let Ok(inbox) = built.inbox(name) {
            for d in inbox.deliveries() {
                let src = d
                    .source
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("{name} received from {src}: {}", d.text());
            }
        }
    }
    let stats = &built.net.stats;
    println!(
        "stats delivered_msgs={} frames_sent={} frames_filtered={} ttl_drops={} no_route_drops={} no_link_address_drops={} not_local_drops={}",
        stats.delivered_msgs,
        stats.frames_sent,
        stats.frames_filtered,
        stats.ttl_drops,
        stats.no_route_drops,
        stats.no_link_address_drops,
        stats.not_local_drops
    );

    if let Some(path) = &args.trace_json {
        if let Some(log) = built.net.trace.take() {
            let json = log.to_json().map_err(|e| e.to_string())?;
            fs::write(path, json).map_err(|e| format!("write {}: {e}", path.display()))?;
            eprintln!("wrote trace events to {}", path.display());
        }
    }

    sent.map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
