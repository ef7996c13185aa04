use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ferrule_core::typed::{PartialMessageHandler, WholeMessageHandler};
use ferrule_core::{Category, EndpointBuilder, EndpointConfig, EndpointSession, PongMessage};

#[derive(Debug, Parser)]
#[command(name = "ferrule")]
#[command(about = "Echo a message through an in-memory endpoint session", long_about = None)]
struct Cli {
    /// Endpoint config file (JSON)
    #[arg(short, long, env = "FERRULE_CONFIG")]
    config: Option<PathBuf>,

    /// Text message to send
    #[arg(short, long, default_value = "Hello World")]
    message: String,

    /// Send the message in fragments of this many bytes (uses a partial handler)
    #[arg(short, long)]
    fragment_size: Option<usize>,

    /// Seconds to wait for the echo
    #[arg(short, long, default_value_t = 5)]
    timeout_secs: u64,
}

/// transport の代わりに channel で流すフレーム
#[derive(Debug)]
enum Frame {
    Text { payload: String, last: bool },
    Pong(PongMessage),
}

/// whole-message: 受け取ったテキストをそのまま返す
struct Echo {
    outbound: mpsc::UnboundedSender<String>,
}

impl WholeMessageHandler<String> for Echo {
    fn on_message(&self, message: String) {
        if self.outbound.send(message).is_err() {
            warn!("client went away before the echo");
        }
    }
}

/// partial-message: 最後の断片が来たらまとめて返す
struct FragmentEcho {
    buffer: Mutex<String>,
    outbound: mpsc::UnboundedSender<String>,
}

impl PartialMessageHandler<String> for FragmentEcho {
    fn on_message(&self, partial: String, last: bool) {
        let mut buffer = self.buffer.lock();
        buffer.push_str(&partial);
        if last && self.outbound.send(std::mem::take(&mut *buffer)).is_err() {
            warn!("client went away before the echo");
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EndpointConfig> {
    match path {
        Some(path) => EndpointConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(EndpointConfig::new("/websockets/tests/hello")),
    }
}

fn build_session(
    config: EndpointConfig,
    fragmented: bool,
    outbound: mpsc::UnboundedSender<String>,
) -> Result<EndpointSession> {
    let builder = EndpointBuilder::from_config(config)
        .whole::<PongMessage, _>(|pong: PongMessage| {
            info!(bytes = pong.application_data().len(), "pong received");
        })
        .expect_categories(&[Category::Text, Category::Pong]);

    let builder = if fragmented {
        builder.partial::<String, _>(FragmentEcho {
            buffer: Mutex::new(String::new()),
            outbound,
        })
    } else {
        builder.whole::<String, _>(Echo { outbound })
    };

    Ok(builder.build()?)
}

/// inbound ループ：channel と session をつなぐ接着剤
async fn inbound_loop(mut inbound: mpsc::Receiver<Frame>, session: Arc<EndpointSession>) {
    while let Some(frame) = inbound.recv().await {
        let result = match frame {
            Frame::Text { payload, last } => session.on_text(payload, last),
            Frame::Pong(pong) => session.on_pong(pong),
        };
        if let Err(e) = result {
            warn!(error = %e, "inbound frame dropped");
        }
    }
}

/// 文字境界を壊さないように分割する
fn fragments(message: &str, size: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in message.chars() {
        if !current.is_empty() && current.len() + ch.len_utf8() > size {
            parts.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    parts.push(current);
    parts
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // (A) session を組み立てる（handler 登録はここで検証される）
    let config = load_config(cli.config.as_ref())?;
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let session = Arc::new(build_session(
        config,
        cli.fragment_size.is_some(),
        outbound_tx,
    )?);
    info!(
        session = %session.id(),
        path = %session.config().path,
        handlers = session.message_handlers().len(),
        "endpoint ready"
    );

    // (B) inbound ループを起動
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let inbound = tokio::spawn(inbound_loop(inbound_rx, session.clone()));

    // (C) メッセージを送る
    let parts = match cli.fragment_size {
        Some(0) => bail!("--fragment-size must be greater than zero"),
        Some(size) => fragments(&cli.message, size),
        None => vec![cli.message.clone()],
    };
    let count = parts.len();
    for (i, payload) in parts.into_iter().enumerate() {
        let last = i + 1 == count;
        inbound_tx.send(Frame::Text { payload, last }).await?;
    }
    inbound_tx
        .send(Frame::Pong(PongMessage::new(b"keepalive".to_vec())))
        .await?;

    // (D) echo を待つ
    let received = timeout(Duration::from_secs(cli.timeout_secs), outbound_rx.recv())
        .await
        .context("timed out waiting for the echo")?
        .context("endpoint closed without replying")?;

    drop(inbound_tx);
    inbound.await?;

    if received != cli.message {
        bail!("echo mismatch: sent {:?}, received {:?}", cli.message, received);
    }
    println!("{received}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_respect_char_boundaries() {
        assert_eq!(fragments("Hello World", 4), vec!["Hell", "o Wo", "rld"]);
        assert_eq!(fragments("ああ", 4), vec!["あ", "あ"]);
        assert_eq!(fragments("", 3), vec![""]);
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Arc::new(build_session(EndpointConfig::new("/t"), true, tx).unwrap());
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let inbound = tokio::spawn(inbound_loop(inbound_rx, session));

        for (i, payload) in fragments("Hello World", 5).into_iter().enumerate() {
            let last = i == 2;
            inbound_tx.send(Frame::Text { payload, last }).await.unwrap();
        }
        drop(inbound_tx);
        inbound.await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "Hello World");
    }
}
