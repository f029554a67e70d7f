use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use ip_core::ResultCode;
use ip_player::ImagePlayer;

/// One line of a command script.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Init,
    Source(String),
    Fd(i32),
    Surface { sample: u32, width: u32, height: u32 },
    Rotate { degrees: f32, auto_crop: bool },
    Scale { sx: f32, sy: f32, auto_crop: bool },
    HwScale(f32),
    Translate { tx: f32, ty: f32 },
    RotateScale { degrees: f32, sx: f32, sy: f32, auto_crop: bool },
    Crop { x: i32, y: i32, width: i32, height: i32 },
    Prepare,
    Show,
    Start,
    PrepareBuf(String),
    ShowBuf,
    Release,
    Dump(PathBuf),
    /// Pause the script, the animation keeps running.
    Wait(Duration),
}

fn arg<T: FromStr>(words: &[&str], i: usize, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let word = words
        .get(i)
        .with_context(|| format!("{} : argument {name} manquant", words[0]))?;
    word.parse()
        .with_context(|| format!("{} : {name} invalide {word:?}", words[0]))
}

/// Optional trailing `autocrop` flag.
fn auto_crop(words: &[&str], i: usize) -> Result<bool> {
    match words.get(i).copied() {
        None => Ok(false),
        Some("autocrop" | "1" | "true") => Ok(true),
        Some("0" | "false") => Ok(false),
        Some(other) => bail!("{} : drapeau inattendu {other:?}", words[0]),
    }
}

/// Parse one line; blank lines and `#` comments give `None`.
///
/// # Errors
/// Unknown command or malformed argument.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some(&name) = words.first() else {
        return Ok(None);
    };
    let cmd = match name.to_ascii_lowercase().as_str() {
        "init" => Command::Init,
        "source" => Command::Source(arg(&words, 1, "uri")?),
        "fd" => Command::Fd(arg(&words, 1, "fd")?),
        "surface" => Command::Surface {
            sample: arg(&words, 1, "sample")?,
            width: arg(&words, 2, "largeur")?,
            height: arg(&words, 3, "hauteur")?,
        },
        "rotate" => Command::Rotate {
            degrees: arg(&words, 1, "degrés")?,
            auto_crop: auto_crop(&words, 2)?,
        },
        "scale" => Command::Scale {
            sx: arg(&words, 1, "sx")?,
            sy: arg(&words, 2, "sy")?,
            auto_crop: auto_crop(&words, 3)?,
        },
        "hwscale" => Command::HwScale(arg(&words, 1, "facteur")?),
        "translate" => Command::Translate {
            tx: arg(&words, 1, "tx")?,
            ty: arg(&words, 2, "ty")?,
        },
        "rotatescale" => Command::RotateScale {
            degrees: arg(&words, 1, "degrés")?,
            sx: arg(&words, 2, "sx")?,
            sy: arg(&words, 3, "sy")?,
            auto_crop: auto_crop(&words, 4)?,
        },
        "crop" => Command::Crop {
            x: arg(&words, 1, "x")?,
            y: arg(&words, 2, "y")?,
            width: arg(&words, 3, "largeur")?,
            height: arg(&words, 4, "hauteur")?,
        },
        "prepare" => Command::Prepare,
        "show" => Command::Show,
        "start" => Command::Start,
        "preparebuf" => Command::PrepareBuf(arg(&words, 1, "uri")?),
        "showbuf" => Command::ShowBuf,
        "release" => Command::Release,
        "dump" => Command::Dump(arg(&words, 1, "préfixe")?),
        "wait" => Command::Wait(Duration::from_millis(arg(&words, 1, "ms")?)),
        other => bail!("commande inconnue : {other}"),
    };
    Ok(Some(cmd))
}

/// Parse a whole script.
///
/// # Errors
/// First malformed line, with its number.
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    let mut out = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if let Some(cmd) = parse_line(line).with_context(|| format!("ligne {}", n + 1))? {
            out.push(cmd);
        }
    }
    Ok(out)
}

/// Run one command against the player.
pub fn execute(player: &mut ImagePlayer, cmd: &Command) -> ResultCode {
    match cmd {
        Command::Init => player.init(),
        Command::Source(uri) => player.set_data_source(uri),
        Command::Fd(fd) => player.set_data_source_fd(*fd),
        Command::Surface {
            sample,
            width,
            height,
        } => player.set_sample_surface_size(*sample, *width, *height),
        Command::Rotate { degrees, auto_crop } => player.set_rotate(*degrees, *auto_crop),
        Command::Scale { sx, sy, auto_crop } => player.set_scale(*sx, *sy, *auto_crop),
        Command::HwScale(f) => player.set_hw_scale(*f),
        Command::Translate { tx, ty } => player.set_translate(*tx, *ty),
        Command::RotateScale {
            degrees,
            sx,
            sy,
            auto_crop,
        } => player.set_rotate_scale(*degrees, *sx, *sy, *auto_crop),
        Command::Crop {
            x,
            y,
            width,
            height,
        } => player.set_crop_rect(*x, *y, *width, *height),
        Command::Prepare => player.prepare(),
        Command::Show => player.show(),
        Command::Start => player.start(),
        Command::PrepareBuf(uri) => player.prepare_buf(uri),
        Command::ShowBuf => player.show_buf(),
        Command::Release => player.release(),
        Command::Dump(prefix) => match player.dump(prefix) {
            Ok(report) => {
                print!("{report}");
                ResultCode::Ok
            }
            Err(e) => {
                log::error!("dump : {e}");
                e.result_code()
            }
        },
        Command::Wait(d) => {
            thread::sleep(*d);
            ResultCode::Ok
        }
    }
}
