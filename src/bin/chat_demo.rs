//! 聊天演示
//!
//! 在 alice <-> r1 <-> r2 <-> server 拓扑上发送一条聊天消息，
//! 可选地让接收方回一条 ack。

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use stacksim_rs::net::SendMessage;
use stacksim_rs::sim::{SimTime, Simulator};
use stacksim_rs::topo::chat::{
    ALICE, ALICE_ADDR, CHAT_PORT, CLIENT_PORT, SERVER, SERVER_ADDR,
};
use stacksim_rs::topo::{ChatOpts, chat_pipeline, chat_topology};
use stacksim_rs::trace::TraceLog;

#[derive(Debug, Parser)]
#[command(name = "chat_demo", about = "聊天演示：alice <-> r1 <-> r2 <-> server")]
struct Args {
    /// 要发送的消息
    #[arg(long)]
    message: String,
    /// 发送方：alice 或 server
    #[arg(long, default_value = ALICE)]
    from: String,
    /// 核心链路（r1-r2）的 MTU
    #[arg(long, default_value_t = 576)]
    mtu: usize,
    #[arg(long, default_value_t = 64)]
    ttl: u8,
    #[arg(long, default_value_t = 512)]
    mss: usize,
    /// 接收方回一条 `ack: <message>`
    #[arg(long)]
    reply: bool,
    /// 输出帧级事件 JSON 文件
    #[arg(long)]
    trace_json: Option<PathBuf>,
    /// 关闭日志输出
    #[arg(long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.quiet { "off" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let opts = ChatOpts {
        core_mtu: args.mtu,
        ttl: args.ttl,
        mss: args.mss,
        ..ChatOpts::default()
    };

    let (from, to, src_addr, dst_addr, src_port, dst_port) = match args.from.as_str() {
        ALICE => (ALICE, SERVER, ALICE_ADDR, SERVER_ADDR, CLIENT_PORT, CHAT_PORT),
        SERVER => (SERVER, ALICE, SERVER_ADDR, ALICE_ADDR, CHAT_PORT, CLIENT_PORT),
        other => {
            eprintln!("error: --from must be {ALICE} or {SERVER}, got {other:?}");
            std::process::exit(2);
        }
    };

    let mut built = chat_topology(&opts).expect("build chat topology");
    if args.trace_json.is_some() {
        built.net.trace = Some(TraceLog::new());
        built.net.emit_trace_meta();
    }

    let pipeline = chat_pipeline(from, src_addr, dst_addr, src_port, dst_port, &opts)
        .unwrap_or_else(|err| {
            eprintln!("error: {err}");
            std::process::exit(2);
        });

    let mut sim = Simulator::new();
    sim.schedule(
        SimTime::ZERO,
        SendMessage {
            from: built.node(from).expect("sender exists"),
            pipeline,
            payload: args.message.clone().into_bytes(),
        },
    );
    if args.reply {
        let reply = chat_pipeline(to, dst_addr, src_addr, dst_port, src_port, &opts)
            .expect("build reply pipeline");
        sim.schedule(
            SimTime::from_millis(1),
            SendMessage {
                from: built.node(to).expect("receiver exists"),
                pipeline: reply,
                payload: format!("ack: {}", args.message).into_bytes(),
            },
        );
    }
    sim.run(&mut built.net);

    let mut delivered = 0;
    for name in [ALICE, SERVER] {
        let inbox = built.inbox(name).expect("chat endpoints have inboxes");
        for d in inbox.deliveries() {
            let src = d
                .source
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!("{name} received from {src}: {}", d.text());
            delivered += 1;
        }
    }
    println!("delivered {delivered} message(s)");

    let stats = &built.net.stats;
    println!(
        "stats frames_sent={} frames_filtered={} ttl_drops={} no_route_drops={} failed_sends={}",
        stats.frames_sent,
        stats.frames_filtered,
        stats.ttl_drops,
        stats.no_route_drops,
        stats.failed_sends
    );

    if let Some(path) = args.trace_json {
        if let Some(log) = built.net.trace.take() {
            let json = log.to_json().expect("serialize trace events");
            fs::write(&path, json).expect("write trace json");
            eprintln!("wrote trace events to {}", path.display());
        }
    }
}
