//! Virtual Chinrest - screen calibration from the terminal
//!
//! This is the CLI entry point for the chinrest tool.
//! Run with: cargo run --bin chinrest

use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;
use virtual_chinrest::config::{get_messages, get_reference, Messages};
use virtual_chinrest::store::{self, keys, seed_defaults};
use virtual_chinrest::{
    AppSettings, CalibrationError, ChinrestProcedure, DisplayCommand, DisplaySurface,
    JsonFileStore, ProcedurePhase, VarValue, VariableStore,
};

/// `+20`, `- 5.5`
static DELTA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])\s*(\d+(?:\.\d+)?)$").unwrap());

/// `w=300`, `w 300`
static WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^w\s*=?\s*(\d+(?:\.\d+)?)$").unwrap());

/// Input parsed from one line of stdin.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Delta(f64),
    Width(f64),
    Finish,
    Quit,
    Help,
    Unknown,
}

fn parse_command(input: &str) -> Command {
    let input = input.trim().to_lowercase();

    if let Some(caps) = DELTA_RE.captures(&input) {
        let value: f64 = caps[2].parse().unwrap_or(0.0);
        return Command::Delta(if &caps[1] == "-" { -value } else { value });
    }
    if let Some(caps) = WIDTH_RE.captures(&input) {
        return caps[1].parse().map(Command::Width).unwrap_or(Command::Unknown);
    }

    match input.as_str() {
        "done" | "finish" | "ok" => Command::Finish,
        "quit" | "exit" | "q" => Command::Quit,
        "help" | "?" | "h" => Command::Help,
        _ => Command::Unknown,
    }
}

/// Renders display commands as terminal text.
#[derive(Debug)]
struct TerminalDisplay {
    messages: &'static Messages,
}

impl TerminalDisplay {
    fn new(messages: &'static Messages) -> Self {
        Self { messages }
    }

    fn render(&self, command: &DisplayCommand) -> Option<String> {
        match command {
            DisplayCommand::ShowInstructions(text) => Some(format!("\n📋 {}\n", text)),
            DisplayCommand::DrawBox(size) | DisplayCommand::ResizeBox(size) => {
                let (width, height) = size.rounded();
                Some(format!("⬜ Box: {}x{} px", width, height))
            }
            DisplayCommand::ResizeCanvas { width, height } => {
                Some(format!("🖼️ Canvas: {:.0}x{:.0} px", width, height))
            }
            DisplayCommand::ShowRemaining(n) => {
                Some(format!("🔁 {} {}", n, self.messages.remaining_measurements))
            }
            DisplayCommand::HideInstructions
            | DisplayCommand::PlaceBlindspotMarkers { .. }
            | DisplayCommand::MoveBall { .. } => None,
        }
    }
}

impl DisplaySurface for TerminalDisplay {
    fn apply(&mut self, command: DisplayCommand) {
        if let Some(line) = self.render(&command) {
            println!("{}", line);
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Saved settings; language and store path may come from the environment
    let mut settings = AppSettings::load();
    if let Ok(lang) = env::var("CHINREST_LANG") {
        settings.lang = lang;
    }
    if let Ok(path) = env::var("CHINREST_STORE") {
        settings.store_path = path;
    }

    if env::args().any(|arg| arg == "--save-settings") {
        match settings.save() {
            Ok(()) => println!("💾 Settings saved"),
            Err(e) => eprintln!("⚠️ Failed to save settings: {}", e),
        }
    }

    // Host variables: stored values, then settings and plugin defaults for
    // missing keys, then explicit environment overrides
    let mut vars = JsonFileStore::open(&settings.store_path)?;
    settings.seed_store(&mut vars);
    seed_defaults(&mut vars);
    for (key, value) in env_overrides() {
        vars.set(key, value);
    }

    // Terminal input has no live key events, so the blind spot task is skipped
    if settings.use_perceived_distance {
        tracing::warn!("Blind spot task is not available in the terminal, skipping it");
    }
    let config = settings
        .procedure_config_from_store(&vars)?
        .with_perceived_distance(false);

    let messages = get_messages(&settings.lang);
    let (item_width, item_height) = (
        config.calibration.reference_width_mm,
        config.calibration.reference_height_mm,
    );

    println!("📏 Virtual Chinrest - Screen Calibration");
    println!("================================================");
    println!("Unit: {}", config.calibration.unit);
    println!("Reference: {:.2} x {:.2} mm", item_width, item_height);
    println!("Initial Size: {} px", config.calibration.initial_size_px);
    println!("Language: {}", settings.lang);
    println!("Variables: {}", vars.path().display());
    println!("================================================");

    let mut procedure = ChinrestProcedure::start(config, TerminalDisplay::new(messages))?;
    print_help(messages);

    let stdin = io::stdin();
    loop {
        print!("📐 Resize: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("\nInput closed, nothing saved.");
            break;
        }

        match parse_command(&line) {
            Command::Delta(delta) => {
                procedure.resize_by(delta);
                print_live_dpi(&procedure, messages.dpi);
            }
            Command::Width(width) => {
                let current = procedure.session().current_box_size_px().width;
                procedure.begin_drag(current);
                procedure.drag_to(width);
                procedure.end_drag();
                print_live_dpi(&procedure, messages.dpi);
            }
            Command::Finish => match procedure.finish_resizing() {
                Ok(ProcedurePhase::Complete) => {
                    procedure.publish(&mut vars)?;
                    vars.save()?;
                    print_report(&procedure, messages.calibration_complete);
                    println!("💾 Variables saved to {}", vars.path().display());
                    break;
                }
                Ok(phase) => {
                    tracing::warn!("Procedure stopped in unexpected phase {:?}", phase);
                    break;
                }
                Err(CalibrationError::SessionNotResized) => {
                    println!("⚠️ {}", messages.not_resized);
                }
                Err(e) => return Err(e.into()),
            },
            Command::Quit => {
                println!(
                    "Calibration cancelled, {} stays {}.",
                    keys::PIXELS_PER_UNIT,
                    store::read_number(&vars, keys::PIXELS_PER_UNIT)?
                        .map(|v| format!("{:.4}", v))
                        .unwrap_or_else(|| "unset".to_string())
                );
                println!("Goodbye! 👋");
                break;
            }
            Command::Help => print_help(messages),
            Command::Unknown => println!("❓ Unknown input, type 'help' for commands"),
        }
    }

    Ok(())
}

fn env_number(name: &str) -> Option<f64> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Store values set explicitly through the environment.
fn env_overrides() -> Vec<(&'static str, VarValue)> {
    let mut overrides = Vec::new();

    if let Ok(unit) = env::var("CHINREST_UNIT") {
        overrides.push((keys::RESIZE_UNIT, VarValue::from(unit)));
    }
    if let Ok(name) = env::var("CHINREST_REFERENCE") {
        match get_reference(&name) {
            Some((width, height)) => {
                overrides.push((keys::ITEM_WIDTH, VarValue::Number(width)));
                overrides.push((keys::ITEM_HEIGHT, VarValue::Number(height)));
            }
            None => tracing::warn!("Unknown reference object '{}', ignoring it", name),
        }
    }
    if let Some(width) = env_number("CHINREST_ITEM_WIDTH") {
        overrides.push((keys::ITEM_WIDTH, VarValue::Number(width)));
    }
    if let Some(height) = env_number("CHINREST_ITEM_HEIGHT") {
        overrides.push((keys::ITEM_HEIGHT, VarValue::Number(height)));
    }
    if let Some(init) = env_number("CHINREST_ITEM_INIT") {
        overrides.push((keys::ITEM_INIT, VarValue::Number(init)));
    }

    overrides
}

fn print_help(messages: &Messages) {
    println!("Commands:");
    println!("  +N / -N   grow or shrink the box by N pixels");
    println!("  w=N       set the box width to N pixels");
    println!("  done      {}: save the calibration", messages.finish);
    println!("  quit      exit without saving\n");
}

fn print_live_dpi<D: DisplaySurface>(procedure: &ChinrestProcedure<D>, label: &str) {
    println!("   {}: {:.1}", label, procedure.session().live_dpi());
}

fn print_report<D: DisplaySurface>(procedure: &ChinrestProcedure<D>, title: &str) {
    let Some(report) = procedure.report() else {
        return;
    };
    let result = &report.result;

    println!("\n✅ {}", title);
    println!("================================================");
    println!("Pixels per {}: {:.4}", result.unit, result.pixels_per_unit);
    println!("Pixels per mm: {:.4}", result.px_per_mm);
    println!("DPI: {:.2}", result.dpi);
    println!("Scaling Factor: {:.4}", report.scaling_factor());
    println!("Squeeze: {:.4}", report.squeeze());
    println!("Session: {}", result.session_id);
    println!("================================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delta() {
        assert_eq!(parse_command("+20"), Command::Delta(20.0));
        assert_eq!(parse_command(" - 5.5 "), Command::Delta(-5.5));
    }

    #[test]
    fn test_parse_width() {
        assert_eq!(parse_command("w=300"), Command::Width(300.0));
        assert_eq!(parse_command("W 120.5"), Command::Width(120.5));
    }

    #[test]
    fn test_render_remaining_is_localized() {
        let en = TerminalDisplay::new(get_messages("en"));
        assert_eq!(
            en.render(&DisplayCommand::ShowRemaining(3)).as_deref(),
            Some("🔁 3 remaining measurements")
        );

        let zh = TerminalDisplay::new(get_messages("cn"));
        assert_eq!(
            zh.render(&DisplayCommand::ShowRemaining(2)).as_deref(),
            Some("🔁 2 剩余测量次数")
        );
        assert_eq!(zh.render(&DisplayCommand::HideInstructions), None);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_command("done"), Command::Finish);
        assert_eq!(parse_command("EXIT"), Command::Quit);
        assert_eq!(parse_command("?"), Command::Help);
        assert_eq!(parse_command("bigger"), Command::Unknown);
        assert_eq!(parse_command("+"), Command::Unknown);
    }
}
