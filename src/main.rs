use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use zip_html_editor::config::{default_config_path, load_config};
use zip_html_editor::Editor;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file (defaults to .zip-html-editor.json when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr; repeat for debug detail.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the HTML documents inside an archive.
    List { zip: PathBuf },

    /// Print the editable text nodes of a document as `index<TAB>text`.
    Texts { zip: PathBuf, doc: String },

    /// Print the preview markup of a document's body after applying edits.
    Preview {
        zip: PathBuf,
        doc: String,
        /// Text edit as INDEX=TEXT; may be repeated.
        #[arg(long = "set", value_parser = parse_edit)]
        edits: Vec<TextEdit>,
    },

    /// Apply edits to a document and write the re-packed archive.
    Edit {
        zip: PathBuf,
        doc: String,
        #[arg(long = "set", value_parser = parse_edit, required = true)]
        edits: Vec<TextEdit>,
        /// Output archive (defaults to the configured download name).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Apply edits to a document and save them as a session file.
    SessionSave {
        zip: PathBuf,
        doc: String,
        /// Tab name stored in the session.
        #[arg(long, default_value = "Main")]
        name: String,
        #[arg(long = "set", value_parser = parse_edit)]
        edits: Vec<TextEdit>,
        /// Output session file (defaults to `<name>.session.zip`).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Restore a session file, export all of its tabs and write the archive.
    SessionRestore {
        session: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
struct TextEdit {
    index: usize,
    text: String,
}

fn parse_edit(raw: &str) -> std::result::Result<TextEdit, String> {
    let (index, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=TEXT, got {raw:?}"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad index {index:?}: {e}"))?;
    if index == 0 {
        return Err("text node indexes start at 1".to_string());
    }
    Ok(TextEdit {
        index,
        text: text.to_string(),
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

fn open_document(editor: &mut Editor, zip: &Path, doc: &str, name: &str) -> Result<()> {
    editor
        .upload(&read_bytes(zip)?)
        .with_context(|| format!("load archive {}", zip.display()))?;
    editor.select_file(doc)?;
    editor.open_tab(name)?;
    Ok(())
}

fn apply_edits(editor: &mut Editor, edits: &[TextEdit]) -> Result<()> {
    for edit in edits {
        if !editor.update_text(edit.index, &edit.text)? {
            tracing::warn!(index = edit.index, "document has no such text node");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;
    let mut editor = Editor::new(config);

    match args.command {
        Command::List { zip } => {
            editor.upload(&read_bytes(&zip)?)?;
            for path in editor.html_files()? {
                println!("{path}");
            }
        }
        Command::Texts { zip, doc } => {
            open_document(&mut editor, &zip, &doc, &doc)?;
            for node in editor.session()?.active_tab()?.text_nodes() {
                println!("{}\t{}", node.index, node.original);
            }
        }
        Command::Preview { zip, doc, edits } => {
            open_document(&mut editor, &zip, &doc, &doc)?;
            apply_edits(&mut editor, &edits)?;
            println!("{}", editor.preview()?);
        }
        Command::Edit {
            zip,
            doc,
            edits,
            out,
        } => {
            open_document(&mut editor, &zip, &doc, &doc)?;
            apply_edits(&mut editor, &edits)?;
            let (name, bytes) = editor.download()?;
            let out = out.unwrap_or_else(|| PathBuf::from(name));
            write_bytes(&out, &bytes)?;
            eprintln!("wrote {}", out.display());
        }
        Command::SessionSave {
            zip,
            doc,
            name,
            edits,
            out,
        } => {
            if name.trim().is_empty() {
                return Err(anyhow!("--name must not be empty"));
            }
            open_document(&mut editor, &zip, &doc, &name)?;
            apply_edits(&mut editor, &edits)?;
            let (file_name, bytes) = editor.export_session()?;
            let out = out.unwrap_or_else(|| PathBuf::from(file_name));
            write_bytes(&out, &bytes)?;
            eprintln!("wrote {}", out.display());
        }
        Command::SessionRestore { session, out } => {
            editor
                .import_session(&read_bytes(&session)?)
                .with_context(|| format!("restore session {}", session.display()))?;
            let saved = editor.save_all()?;
            tracing::info!(tabs = saved, "restored tabs exported");
            let (name, bytes) = editor.pack()?;
            let out = out.unwrap_or_else(|| PathBuf::from(name));
            write_bytes(&out, &bytes)?;
            eprintln!("wrote {} ({saved} tabs)", out.display());
        }
    }
    Ok(())
}
