use color_eyre::{eyre::eyre, Result};
use opencontrol_input::hal::{ButtonDef, SimulatedInput};
use opencontrol_input::midi::{LogMidiOutput, MidiOutput};
use opencontrol_input::{
    AppBuilder, AppConfig, AppError, Context, ContextApi, MidiConfig, OpenControlApp, Requirements,
};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const MAIN_CONTEXT: u8 = 0;
const BUTTON1_CC: u8 = 20;
const BUTTON2_CC: u8 = 21;

/// Button 1 is momentary, button 2 toggles and resets on double tap.
#[derive(Default)]
struct MainContext {
    channel: u8,
    toggle: Rc<Cell<bool>>,
}

impl Context for MainContext {
    fn requirements() -> Requirements {
        Requirements {
            button: true,
            encoder: false,
            midi: true,
        }
    }

    fn initialize(&mut self, api: &mut ContextApi<'_>) -> Result<(), AppError> {
        info!("[Context] Initializing...");
        let midi = api.require_midi()?;
        let channel = self.channel;

        let out = midi.clone();
        api.on_button(1).press().then(move || {
            out.send_cc(channel, BUTTON1_CC, 127);
            info!("[Button 1] Press -> CC 127");
        });

        let out = midi.clone();
        api.on_button(1).release().then(move || {
            out.send_cc(channel, BUTTON1_CC, 0);
            info!("[Button 1] Release -> CC 0");
        });

        api.on_button(1)
            .long_press()
            .then(|| info!("[Button 1] Long press!"));

        let out = midi.clone();
        let toggle = self.toggle.clone();
        api.on_button(2).press().then(move || {
            toggle.set(!toggle.get());
            let value = if toggle.get() { 127 } else { 0 };
            out.send_cc(channel, BUTTON2_CC, value);
            info!("[Button 2] Toggle -> CC {}", value);
        });

        let toggle = self.toggle.clone();
        api.on_button(2).double_tap().then(move || {
            toggle.set(false);
            midi.send_cc(channel, BUTTON2_CC, 0);
            info!("[Button 2] Double tap -> Reset");
        });

        info!("[Context] Ready");
        Ok(())
    }

    fn cleanup(&mut self) {
        info!("[Context] Cleanup");
    }

    fn name(&self) -> &str {
        "Main"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = AppConfig::load_or_default(AppConfig::default_path()?)?;
    let simulated = SimulatedInput::new();

    let mut app = build_app(&config, simulated.clone())?;

    let channel = config.midi.channel;
    app.register_context_with(MAIN_CONTEXT, "Main", move || MainContext {
        channel,
        ..MainContext::default()
    })
    .map_err(|e| report(&e))?;
    app.begin().map_err(|e| report(&e))?;

    info!("[OK] Ready");
    info!("Button 1: Press=CC127, Release=CC0, LongPress=debug");
    info!("Button 2: Toggle CC, DoubleTap=Reset");

    spawn_keyboard(config.buttons.clone(), simulated);
    run(&mut app, config.tick_interval_ms).await;

    app.shutdown();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn report(e: &AppError) -> color_eyre::Report {
    error!("[ERROR] {}", e.code());
    eyre!("{}", e)
}

fn build_app(config: &AppConfig, simulated: SimulatedInput) -> Result<OpenControlApp> {
    let mut builder = AppBuilder::from_config(config);

    if let Some(output) = midi_output(&config.midi) {
        builder = builder.midi(output);
    }

    #[cfg(feature = "rpi")]
    {
        let _ = simulated;
        let source = opencontrol_input::hal::rpi::RpiInputSource::new(&config.buttons)
            .map_err(|e| eyre!("Failed to open GPIO: {}", e))?;
        builder = builder.input_source(source);
    }
    #[cfg(not(feature = "rpi"))]
    {
        builder = builder.input_source(simulated);
    }

    builder.build().map_err(|e| report(&e))
}

fn midi_output(config: &MidiConfig) -> Option<Box<dyn MidiOutput>> {
    if !config.enabled {
        warn!("MIDI output disabled in config");
        return None;
    }

    #[cfg(feature = "midir")]
    {
        use opencontrol_input::midi::midir_out::MidirOutput;
        match MidirOutput::connect("opencontrol", config.port_name.as_deref()) {
            Ok(output) => return Some(Box::new(output)),
            Err(e) => warn!("MIDI port unavailable ({}), logging messages instead", e),
        }
    }

    Some(Box::new(LogMidiOutput))
}

/// Reads button numbers from stdin and toggles the matching simulated button.
fn spawn_keyboard(buttons: Vec<ButtonDef>, input: SimulatedInput) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Ok(id) = line.trim().parse::<u8>() else {
                        debug!("Ignoring input '{}'", line.trim());
                        continue;
                    };
                    match buttons.iter().find(|b| b.id == id) {
                        Some(button) => {
                            let pressed = input.toggle(button);
                            info!("Button {} {}", id, if pressed { "down" } else { "up" });
                        }
                        None => warn!("No button with id {}", id),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
}

async fn run(app: &mut OpenControlApp, tick_ms: u64) {
    let mut ticker = interval(Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => app.update(),
            _ = &mut shutdown => {
                info!("Ctrl-C received");
                break;
            }
        }
    }
}
