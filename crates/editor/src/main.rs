//! `shardhaven-editor`: drives the grid editor from the command line.
//!
//! Every command runs the same controller an interactive front end would:
//! it selects the haven, clicks cells, fills the form and saves.
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use shardhaven_editor::{Editor, HttpTransport, Mode, SyncClient};
use shardhaven_protocol::{paths, Direction, HavenId};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shardhaven-editor")]
#[command(about = "Edit shardhaven layouts over the layout API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server origin
    #[arg(long, env = "SHARDHAVEN_URL", default_value = "http://127.0.0.1:39444", global = true)]
    url: String,

    /// API base path
    #[arg(long, env = "SHARDHAVEN_BASE_PATH", default_value = paths::DEFAULT_BASE, global = true)]
    base_path: String,

    /// Value of the `sessionid` cookie
    #[arg(long, env = "SHARDHAVEN_SESSION", global = true, hide_env_values = true)]
    session: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List havens
    List,
    /// Print a haven's text map and its rooms
    Show { haven_id: HavenId },
    /// Render a haven to PNG
    Render {
        haven_id: HavenId,
        #[arg(short, long, default_value = "haven.png")]
        out: PathBuf,
        /// Highlight the room at X,Y
        #[arg(long, value_parser = parse_xy)]
        select: Option<(u32, u32)>,
    },
    /// Place a room on an empty cell
    Create { haven_id: HavenId, x: u32, y: u32 },
    /// Change fields of a room; unspecified fields keep their value
    Edit {
        haven_id: HavenId,
        x: u32,
        y: u32,
        #[command(flatten)]
        fields: EditFields,
    },
    /// Remove a room
    Delete { haven_id: HavenId, x: u32, y: u32 },
}

#[derive(Args)]
struct EditFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Obstacle id for the north edge, 0 for none
    #[arg(long)]
    obstacle_north: Option<String>,
    #[arg(long)]
    obstacle_south: Option<String>,
    #[arg(long)]
    obstacle_east: Option<String>,
    #[arg(long)]
    obstacle_west: Option<String>,
    /// Monster id, 0 for none
    #[arg(long)]
    monster: Option<String>,
    #[arg(long)]
    monster_defeated: Option<bool>,
    /// Puzzle id, 0 for none
    #[arg(long)]
    puzzle: Option<String>,
    #[arg(long)]
    puzzle_solved: Option<bool>,
    /// Make this room the entrance
    #[arg(long)]
    entrance: bool,
}

fn parse_xy(raw: &str) -> Result<(u32, u32), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {raw:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

type CliEditor = Editor<HttpTransport>;

fn check_alert(editor: &mut CliEditor) -> anyhow::Result<()> {
    match editor.take_alert() {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

async fn open_haven(editor: &mut CliEditor, haven_id: HavenId) -> anyhow::Result<()> {
    editor.select_haven(Some(haven_id)).await;
    check_alert(editor)?;
    if editor.controller().grid().width() == 0 {
        bail!("haven {haven_id} has no layout");
    }
    Ok(())
}

/// Clicks `(x, y)` and insists on ending up editing that room.
async fn select_room(editor: &mut CliEditor, x: u32, y: u32) -> anyhow::Result<()> {
    if !editor.controller().grid().is_room(x, y) {
        bail!("no room at ({x}, {y})");
    }
    editor.click_cell(x, y).await;
    match editor.controller().mode() {
        Mode::EditingRoom { x: sx, y: sy } if (sx, sy) == (x, y) => Ok(()),
        _ => bail!("({x}, {y}) cannot be selected; row and column 0 are reserved"),
    }
}

fn apply_fields(editor: &mut CliEditor, fields: EditFields) {
    let form = editor.form_mut();
    if let Some(v) = fields.name {
        form.name = v;
    }
    if let Some(v) = fields.description {
        form.description = v;
    }
    for (dir, value) in [
        (Direction::North, fields.obstacle_north),
        (Direction::South, fields.obstacle_south),
        (Direction::East, fields.obstacle_east),
        (Direction::West, fields.obstacle_west),
    ] {
        if let Some(v) = value {
            form.set_obstacle(dir, v);
        }
    }
    if let Some(v) = fields.monster {
        form.monster = v;
    }
    if let Some(v) = fields.monster_defeated {
        form.monster_defeated = v;
    }
    if let Some(v) = fields.puzzle {
        form.puzzle = v;
    }
    if let Some(v) = fields.puzzle_solved {
        form.puzzle_solved = v;
    }
    if fields.entrance {
        form.entrance = true;
    }
}

async fn show(editor: &mut CliEditor, haven_id: HavenId) -> anyhow::Result<()> {
    open_haven(editor, haven_id).await?;
    let map = editor.client().ascii_map(haven_id).await?;
    print!("{map}");

    let view = editor.controller().view();
    for (x, y, cell) in editor.controller().grid().rooms() {
        let mut line = format!("({x},{y})");
        if !cell.name.is_empty() {
            line.push_str(&format!(" {:?}", cell.name));
        }
        for dir in Direction::ALL {
            if let Some(id) = cell.obstacle(dir) {
                let label = view.obstacles.label(id.as_str()).unwrap_or(id.as_str());
                line.push_str(&format!(" {}={label}", dir.obstacle_key()));
            }
        }
        if let Some(id) = &cell.monster {
            let label = view.monsters.label(id.as_str()).unwrap_or(id.as_str());
            let state = if cell.monster_defeated { " (defeated)" } else { "" };
            line.push_str(&format!(" monster={label}{state}"));
        }
        if let Some(id) = &cell.puzzle {
            let label = view.puzzles.label(id.as_str()).unwrap_or(id.as_str());
            let state = if cell.puzzle_solved { " (solved)" } else { "" };
            line.push_str(&format!(" puzzle={label}{state}"));
        }
        if cell.entrance {
            line.push_str(" entrance");
        }
        println!("{line}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn,shardhaven_editor=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let transport = HttpTransport::new(&cli.url, &cli.base_path, cli.session);
    let mut editor = Editor::new(SyncClient::new(transport));

    match cli.command {
        Commands::List => {
            editor.start().await;
            check_alert(&mut editor)?;
            for choice in editor.controller().view().havens.choices() {
                println!("{}\t{}", choice.id, choice.name);
            }
        }
        Commands::Show { haven_id } => show(&mut editor, haven_id).await?,
        Commands::Render {
            haven_id,
            out,
            select,
        } => {
            open_haven(&mut editor, haven_id).await?;
            if let Some((x, y)) = select {
                select_room(&mut editor, x, y).await?;
            }
            let controller = editor.controller();
            controller
                .view()
                .renderer()
                .save_png(controller.grid(), &out)
                .with_context(|| format!("write {}", out.display()))?;
            println!("{}", out.display());
        }
        Commands::Create { haven_id, x, y } => {
            open_haven(&mut editor, haven_id).await?;
            if editor.controller().grid().is_room(x, y) {
                bail!("there is already a room at ({x}, {y})");
            }
            editor.click_cell(x, y).await;
            check_alert(&mut editor)?;
            if editor.controller().mode() != (Mode::EditingRoom { x, y }) {
                bail!("({x}, {y}) cannot hold a room; row and column 0 are reserved");
            }
            println!("created ({x}, {y})");
        }
        Commands::Edit {
            haven_id,
            x,
            y,
            fields,
        } => {
            open_haven(&mut editor, haven_id).await?;
            select_room(&mut editor, x, y).await?;
            apply_fields(&mut editor, fields);
            editor.save().await;
            check_alert(&mut editor)?;
            println!("saved ({x}, {y})");
        }
        Commands::Delete { haven_id, x, y } => {
            open_haven(&mut editor, haven_id).await?;
            select_room(&mut editor, x, y).await?;
            editor.delete().await;
            check_alert(&mut editor)?;
            println!("deleted ({x}, {y})");
        }
    }
    Ok(())
}
