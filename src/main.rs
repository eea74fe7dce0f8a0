use anyhow::Context;
use clap::{Parser, Subcommand};
use gesture_macros::actions::{SystemInputBackend, ACTION_HELP};
use gesture_macros::hand_gestures::{
    DispatchOutcome, GestureDispatcher, GestureSignature, JsonLinesLandmarks, Macro,
    RecordedPose, RegistryEditError, RegistryStore, TrackingLoop,
};
use gesture_macros::logging;
use gesture_macros::macros::MacroInterpreter;
use gesture_macros::settings::Settings;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "gesture-macros", about = "Run input macros from hand gestures")]
struct Args {
    /// Settings file
    #[arg(long, default_value = "settings.json")]
    settings: String,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List bound gestures
    List,
    /// Print the actions of one macro
    Show { signature: GestureSignature },
    /// Bind a new gesture
    Add {
        signature: GestureSignature,
        #[arg(long)]
        name: String,
        /// Action line; repeat for several
        #[arg(long = "action")]
        actions: Vec<String>,
    },
    /// Rename a macro or replace its actions
    Edit {
        signature: GestureSignature,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "action")]
        actions: Vec<String>,
    },
    /// Delete a binding
    Remove { signature: GestureSignature },
    /// Execute the macro bound to a gesture now
    Run { signature: GestureSignature },
    /// Feed a recorded landmark session through the dispatcher
    Replay { file: PathBuf },
    /// Describe the action syntax
    ActionsHelp,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args.settings)
        .with_context(|| format!("load settings from {}", args.settings))?;
    logging::init(args.debug || settings.debug_logging, settings.log_file.clone());

    let store = RegistryStore::new(&settings.registry_path);
    match args.command {
        Command::List => {
            let registry = store.load()?;
            if registry.is_empty() {
                println!("no gestures bound");
            }
            for (signature, entry) in registry.list() {
                println!("{signature}  {}  ({} actions)", entry.name, entry.actions.len());
            }
        }
        Command::Show { signature } => {
            let registry = store.load()?;
            let entry = registry
                .get(&signature)
                .ok_or_else(|| RegistryEditError::NotFound(signature.clone()))?;
            println!("{} [{signature}]", entry.name);
            for line in &entry.actions {
                println!("  {line}");
            }
        }
        Command::Add {
            signature,
            name,
            actions,
        } => {
            let entry = if actions.is_empty() {
                let name = name.trim();
                if name.is_empty() {
                    return Err(RegistryEditError::EmptyName.into());
                }
                Macro::placeholder(name)
            } else {
                Macro::from_editor(&name, &actions.join("\n"))?
            };
            store.update(|registry| registry.insert_new(signature.clone(), entry))?;
            tracing::info!(gesture = %signature, "gesture bound");
        }
        Command::Edit {
            signature,
            name,
            actions,
        } => {
            store.update(|registry| -> anyhow::Result<()> {
                let current = registry
                    .get(&signature)
                    .cloned()
                    .ok_or_else(|| RegistryEditError::NotFound(signature.clone()))?;
                let name = name.unwrap_or(current.name);
                let text = if actions.is_empty() {
                    current.actions.join("\n")
                } else {
                    actions.join("\n")
                };
                registry.add_or_replace(signature.clone(), Macro::from_editor(&name, &text)?);
                Ok(())
            })?;
        }
        Command::Remove { signature } => {
            store.update(|registry| {
                registry
                    .remove(&signature)
                    .map(|_| ())
                    .ok_or_else(|| RegistryEditError::NotFound(signature.clone()))
            })?;
        }
        Command::Run { signature } => {
            let registry = store.load()?;
            let entry = registry
                .get(&signature)
                .ok_or_else(|| RegistryEditError::NotFound(signature.clone()))?;
            let interpreter = MacroInterpreter::new(Arc::new(SystemInputBackend));
            match interpreter.execute(&entry.actions) {
                Ok(()) => println!("Executed: {}", entry.name),
                Err(err) => anyhow::bail!("Error in {}: {err}", entry.name),
            }
        }
        Command::Replay { file } => {
            let reader = std::fs::File::open(&file)
                .with_context(|| format!("open {}", file.display()))?;
            let mut source = JsonLinesLandmarks::new(BufReader::new(reader));
            let observer = Arc::new(|outcome: &DispatchOutcome| {
                if !matches!(outcome, DispatchOutcome::Started(_)) {
                    println!("{}", outcome.status_message());
                }
            });
            let interpreter = MacroInterpreter::new(Arc::new(SystemInputBackend));
            let mut dispatcher =
                GestureDispatcher::new(store, interpreter, observer).with_cooldown(settings.cooldown());
            let tracking = TrackingLoop::new(settings.frame_interval());
            let frames = tracking.run(&mut source, &mut RecordedPose, &mut dispatcher, |outcome| {
                if let DispatchOutcome::Started(_) = outcome {
                    println!("{}", outcome.status_message());
                }
            })?;
            dispatcher.wait_idle();
            tracing::info!(frames, "replay finished");
        }
        Command::ActionsHelp => println!("{ACTION_HELP}"),
    }
    Ok(())
}
