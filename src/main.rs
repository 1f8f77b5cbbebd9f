use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use roam_chat::config::VoiceConfig;
use roam_chat::session::Notice;
use roam_chat::voice::{
    AudioCapture, AudioPlayback, EndpointSettings, MicrophoneRecognizer, SAMPLE_RATE,
    SpeakerSynthesizer, SpeechRecognizer, SpeechSynthesizer, SpeechToText, TextToSpeech,
    decode_mp3, endpoint::calculate_energy,
};
use roam_chat::{
    Config, Devices, EventSink, HttpConversationClient, Itinerary, ItinerarySummary, Role,
    Session, SessionEvent, SessionHandle, SessionRunner,
};

/// Roam - chat with an AI travel planner
#[derive(Parser)]
#[command(name = "roam", version, about)]
struct Cli {
    /// Path to a config file (defaults to ~/.config/roam/config.toml)
    #[arg(short, long, env = "ROAM_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice features (for machines without audio hardware)
    #[arg(long)]
    disable_voice: bool,

    /// Start with voice output muted
    #[arg(long)]
    muted: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Check that the planner backend is reachable
    Health,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; the REPL owns stdout, logs go to stderr
    let filter = match cli.verbose {
        0 => "warn,roam_chat=warn",
        1 => "info,roam_chat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_with_options(cli.config.as_deref(), cli.disable_voice);
    if cli.muted {
        config.session.start_muted = true;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Health) => health(&config).await,
        Some(Command::TestMic { duration }) => test_mic(duration).await,
        Some(Command::TestTts { text }) => test_tts(&config.voice, &text).await,
        None => chat(config).await,
    }
}

/// Interactive chat loop
async fn chat(config: Config) -> anyhow::Result<()> {
    let client = Arc::new(HttpConversationClient::from_config(&config.api)?);
    let devices = build_devices(&config.voice);
    println!(
        "(voice input {}, voice output {})",
        availability(devices.recognizer.is_some()),
        availability(devices.synthesizer.is_some()),
    );

    let (plans_tx, mut plans_rx) = mpsc::unbounded_channel::<Itinerary>();
    let (events, mut events_rx) = EventSink::channel();

    let (session, recognition) = Session::new(
        &config.session,
        devices,
        Box::new(move |plan: Itinerary| {
            let _ = plans_tx.send(plan);
        }),
        events,
    );
    let runner = SessionRunner::new(
        session,
        recognition,
        client,
        config.api.request_timeout,
        config.session.handoff_delay,
    );
    let (handle, task) = runner.spawn();

    tracing::info!(api = %config.api.base_url, "starting chat session");

    let state = handle.snapshot().await?;
    for message in state.transcript().messages() {
        print_message(message.role(), message.content());
    }
    println!("(commands: /reset, /mute, /listen, /quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&handle, line.trim()).await? {
                    break;
                }
            }
            Some(event) = events_rx.recv() => print_event(event),
            Some(plan) = plans_rx.recv() => {
                println!("\n{}", ItinerarySummary::from_itinerary(&plan));
            }
        }
    }

    let _ = handle.shutdown();
    task.await?;
    Ok(())
}

/// Apply one line of user input; returns false when the user quits
async fn handle_line(handle: &SessionHandle, line: &str) -> anyhow::Result<bool> {
    match line {
        "" => {}
        "/quit" | "/exit" => return Ok(false),
        "/reset" => {
            if let Err(e) = handle.reset().await {
                println!("({e})");
            }
        }
        "/mute" => handle.toggle_mute()?,
        "/listen" => handle.toggle_listening()?,
        text => handle.submit(text)?,
    }
    Ok(true)
}

const fn availability(present: bool) -> &'static str {
    if present { "on" } else { "off" }
}

fn print_message(role: Role, content: &str) {
    println!("{}", format_message(role, content));
}

fn format_message(role: Role, content: &str) -> String {
    match role {
        Role::Assistant => format!("roam> {content}"),
        Role::User => format!("you> {content}"),
    }
}

fn print_event(event: SessionEvent) {
    if let Some(line) = describe_event(&event) {
        println!("{line}");
    }
}

/// Terminal line for a session event, if it shows anything
fn describe_event(event: &SessionEvent) -> Option<String> {
    let line = match event {
        // Spoken input only reaches the screen this way
        SessionEvent::MessageAppended(message) => {
            format_message(message.role(), message.content())
        }
        SessionEvent::TranscriptReset(greeting) => format!(
            "--- new conversation ---\n{}",
            format_message(greeting.role(), greeting.content())
        ),
        SessionEvent::PendingChanged(true) => "(thinking...)".to_string(),
        SessionEvent::ListeningChanged(listening) => {
            let line = if *listening { "(listening...)" } else { "(stopped listening)" };
            line.to_string()
        }
        SessionEvent::MuteChanged(muted) => {
            let line = if *muted { "(voice muted)" } else { "(voice unmuted)" };
            line.to_string()
        }
        SessionEvent::Notice(Notice::CapabilityUnavailable(capability)) => {
            format!("({capability} is not available)")
        }
        SessionEvent::PendingChanged(false) | SessionEvent::PlanHandedOff => return None,
    };
    Some(line)
}

/// Build speech devices from config; missing pieces leave the capability off
fn build_devices(voice: &VoiceConfig) -> Devices {
    if !voice.enabled {
        return Devices::default();
    }

    let Some(api_key) = voice.api_key.clone() else {
        tracing::warn!("no speech API key configured, voice disabled");
        return Devices::default();
    };

    let recognizer = SpeechToText::new(&voice.api_url, api_key.clone(), voice.stt_model.clone())
        .map(|stt| {
            Box::new(MicrophoneRecognizer::new(stt, EndpointSettings::default()))
                as Box<dyn SpeechRecognizer>
        })
        .map_err(|e| tracing::warn!(error = %e, "speech recognition unavailable"))
        .ok();

    let synthesizer = TextToSpeech::new(
        &voice.api_url,
        api_key,
        voice.tts_model.clone(),
        voice.tts_voice.clone(),
        voice.tts_speed,
    )
    .and_then(|tts| Ok((tts, AudioPlayback::new()?)))
    .map(|(tts, playback)| {
        Box::new(SpeakerSynthesizer::new(tts, playback)) as Box<dyn SpeechSynthesizer>
    })
    .map_err(|e| tracing::warn!(error = %e, "speech output unavailable"))
    .ok();

    Devices {
        recognizer,
        synthesizer,
    }
}

/// Check the planner backend
async fn health(config: &Config) -> anyhow::Result<()> {
    let client = HttpConversationClient::from_config(&config.api)?;
    println!("Checking {} ...", config.api.base_url);
    client.health().await?;
    println!("Planner backend is up.");
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check that the default input device is set.");

    Ok(())
}

/// Test TTS output
async fn test_tts(voice: &VoiceConfig, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let api_key = voice
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
    let tts = TextToSpeech::new(
        &voice.api_url,
        api_key,
        voice.tts_model.clone(),
        voice.tts_voice.clone(),
        voice.tts_speed,
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    let samples = decode_mp3(&mp3_data)?;
    let playback = AudioPlayback::new()?;

    println!("Playing audio...");
    tokio::task::spawn_blocking(move || playback.play_blocking(samples, &AtomicBool::new(false)))
        .await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use roam_chat::Message;

    use super::*;

    #[test]
    fn user_messages_are_shown() {
        let event = SessionEvent::MessageAppended(Message::user("Somewhere warm"));
        assert_eq!(describe_event(&event).as_deref(), Some("you> Somewhere warm"));
    }

    #[test]
    fn assistant_messages_are_shown() {
        let event = SessionEvent::MessageAppended(Message::assistant("Lovely!"));
        assert_eq!(describe_event(&event).as_deref(), Some("roam> Lovely!"));
    }

    #[test]
    fn settled_request_prints_nothing() {
        assert!(describe_event(&SessionEvent::PendingChanged(false)).is_none());
        assert!(describe_event(&SessionEvent::PlanHandedOff).is_none());
    }
}
