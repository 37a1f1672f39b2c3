//! Interactive chat over a live session.

use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use mkedev_agent::{
    EnvCredentialProvider, SessionOptions, SessionParts, SessionUpdate, VoiceSession,
    WsSessionFactory,
};
use mkedev_audio::{NullPlayback, Player, Recorder, SilenceCapture};
use mkedev_live::{MODEL_FLASH_NATIVE_AUDIO, Modality};
use mkedev_tools::{Card, MapControl, SampleData, StaticZoning, ToolDeps, builtin_registry};

/// Map control that narrates what the session does to the map.
struct ConsoleMap;

#[async_trait]
impl MapControl for ConsoleMap {
    async fn fly_to(&self, lng: f64, lat: f64, zoom: f64) -> anyhow::Result<()> {
        println!("  [map] fly to ({lng:.4}, {lat:.4}) zoom {zoom}");
        Ok(())
    }

    async fn set_layer_visibility(&self, layer: &str, visible: bool) -> anyhow::Result<()> {
        println!("  [map] layer {layer} visible={visible}");
        Ok(())
    }

    async fn set_layer_opacity(&self, layer: &str, opacity: f64) -> anyhow::Result<()> {
        println!("  [map] layer {layer} opacity={opacity}");
        Ok(())
    }

    async fn reset_view(&self) -> anyhow::Result<()> {
        println!("  [map] reset view");
        Ok(())
    }

    async fn capture_snapshot(&self) -> anyhow::Result<String> {
        println!("  [map] snapshot captured");
        Ok("console-snapshot".to_string())
    }
}

#[derive(Args)]
pub struct ChatCommand {
    /// Model to request
    #[arg(long, default_value = MODEL_FLASH_NATIVE_AUDIO)]
    pub model: String,

    /// Voice for audio output
    #[arg(long)]
    pub voice: Option<String>,

    /// Request text responses instead of audio
    #[arg(long)]
    pub text: bool,
}

impl ChatCommand {
    pub async fn run(&self) -> anyhow::Result<()> {
        let registry = builtin_registry(ToolDeps {
            map: Arc::new(ConsoleMap),
            data: Arc::new(SampleData::new()),
            zoning: Arc::new(StaticZoning),
        });

        let mut options = SessionOptions::default();
        if self.text {
            options.modalities = vec![Modality::Text];
        }
        if let Some(voice) = &self.voice {
            options.voice = Some(voice.clone());
        }

        let (session, mut updates) = VoiceSession::new(
            options,
            SessionParts {
                factory: Arc::new(WsSessionFactory::new()),
                credentials: Arc::new(EnvCredentialProvider::new(
                    "GEMINI_API_KEY",
                    &self.model,
                )),
                registry: Arc::new(registry),
                recorder: Recorder::new(Box::new(SilenceCapture::default())),
                player: Player::new(Box::new(NullPlayback)),
            },
        );

        session.start_session().await?;
        println!("Connected. Type a question, or /quit to exit.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                update = updates.recv() => {
                    match update {
                        Some(update) => render_update(update),
                        None => break,
                    }
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            let line = line.trim();
                            if line == "/quit" {
                                break;
                            }
                            if !line.is_empty() {
                                session.send_text(line).await?;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        session.end_session().await;
        println!("Session ended.");
        Ok(())
    }
}

fn render_update(update: SessionUpdate) {
    match update {
        SessionUpdate::StateChanged(state) => println!("-- {state}"),
        SessionUpdate::PartialTranscript(_) => {}
        SessionUpdate::EntryAppended(entry) => {
            println!("{:?}: {}", entry.role, entry.text);
            for card in &entry.cards {
                render_card(card);
            }
        }
        SessionUpdate::SessionError(message) => eprintln!("!! {message}"),
    }
}

fn render_card(card: &Card) {
    match card {
        Card::AddressPin { address, lng, lat } => {
            println!("  [card] pin: {address} ({lng:.4}, {lat:.4})");
        }
        Card::ZoningAnswer { question, .. } => {
            println!("  [card] zoning answer for: {question}");
        }
        Card::HomeListings { homes } => {
            println!("  [card] {} home(s):", homes.len());
            for home in homes {
                println!("    {} - ${} ({})", home.address, home.price, home.neighborhood);
            }
        }
        Card::CommercialListings { properties } => {
            println!("  [card] {} commercial propert(ies):", properties.len());
            for p in properties {
                println!("    {} - ${} ({})", p.address, p.price, p.property_type);
            }
        }
        Card::DevelopmentSites { sites } => {
            println!("  [card] {} development site(s):", sites.len());
            for site in sites {
                println!("    {} - {} zoning, {} sq ft", site.address, site.zoning, site.lot_sqft);
            }
        }
        Card::PropertyDetail { property } => {
            println!("  [card] {}: {}", property.address, property.description);
        }
        Card::MapSnapshot { reference } => {
            println!("  [card] snapshot: {reference}");
        }
    }
}
