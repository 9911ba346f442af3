use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::info;

use crate::config::Config;
use crate::font::{FontBuilder, FontResource};
use crate::render::{render_immediate, Baker, PixelFormat, Translucency};

#[derive(Parser)]
#[command(name = "dsfont")]
#[command(version)]
#[command(about = "Inspect bitmap fonts and render text to quads or textures", long_about = None)]
#[command(after_help = "\
TEXT:
    A literal `\\n` in TEXT is turned into a line break.

CONFIG:
    Settings are read from $XDG_CONFIG_HOME/dsfont/config.toml unless
    --config is given.")]
pub struct Cli {
    /// Path to a config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print font metrics and atlas information
    Inspect { font: PathBuf },

    /// Print the quads generated for TEXT
    Quads {
        font: PathBuf,
        text: String,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        x: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        y: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        z: i32,
        /// Translucency alpha (0-31); requires --poly-id
        #[arg(long, requires = "poly_id")]
        alpha: Option<u8>,
        /// Polygon ID (0-63) for manual translucency ordering
        #[arg(long, requires = "alpha")]
        poly_id: Option<u8>,
    },

    /// Render TEXT into a raw texture file
    Bake {
        font: PathBuf,
        text: String,
        /// Output pixel format: i4, i8, a3i5, a5i3 or direct
        #[arg(long, default_value = "i4")]
        format: PixelFormat,
        #[arg(long, default_value_t = 256)]
        max_width: u32,
        #[arg(long, default_value_t = 256)]
        max_height: u32,
        #[arg(long)]
        out: PathBuf,
    },

    /// Write a small built-in font for testing
    SampleFont {
        #[arg(long)]
        out: PathBuf,
    },
}

pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    match cli.command {
        Command::Inspect { font } => {
            let font = load_font(&config, &font)?;
            let atlas = font.atlas();
            println!("name:        {}", font.name());
            println!("size:        {}", font.size());
            println!("flags:       {:?}", font.flags());
            println!("glyphs:      {}", font.glyph_count());
            println!("line height: {}", font.line_height());
            println!("base:        {}", font.base());
            println!(
                "atlas:       {}x{} {} ({} palette entries)",
                atlas.width(),
                atlas.height(),
                atlas.format(),
                atlas.palette().len()
            );
            println!("fallback:    U+{:04X}", font.fallback().codepoint as u32);
        }
        Command::Quads {
            font,
            text,
            x,
            y,
            z,
            alpha,
            poly_id,
        } => {
            let font = load_font(&config, &font)?;
            let translucency = match (alpha, poly_id) {
                (Some(a), Some(id)) => Some(Translucency::new(a, id)?),
                _ => None,
            };
            let quads = render_immediate(&font, unescape(&text), x, y, z, translucency);
            for (i, quad) in quads.iter().enumerate() {
                let [qx, qy, qz] = quad.origin();
                let [w, h] = quad.size();
                let uv = quad.vertices[0].texcoord;
                println!(
                    "{:4}: pos=({}, {}, {}) size={}x{} uv=({:.4}, {:.4}) alpha={} id={}{}",
                    i,
                    qx,
                    qy,
                    qz,
                    w,
                    h,
                    uv[0],
                    uv[1],
                    quad.alpha,
                    quad.polygon_id,
                    if quad.is_substituted() { " (fallback)" } else { "" }
                );
            }
            info!("{} quads", quads.len());
        }
        Command::Bake {
            font,
            text,
            format,
            max_width,
            max_height,
            out,
        } => {
            let font = load_font(&config, &font)?;
            let baker = Baker::new(config.texture_limits())?;
            let text = unescape(&text);
            let baked = baker.bake(&font, text.as_bytes(), format, max_width, max_height)?;
            println!(
                "{}x{} {} texture, content {}x{}",
                baked.width(),
                baked.height(),
                baked.format(),
                baked.content_width(),
                baked.content_height()
            );
            fs::write(&out, baked.into_data())?;
            info!("Wrote {}", out.display());
        }
        Command::SampleFont { out } => {
            fs::write(&out, FontBuilder::sample().build())?;
            info!("Wrote sample font to {}", out.display());
        }
    }

    Ok(())
}

fn load_font(config: &Config, path: &Path) -> Result<FontResource, Box<dyn Error>> {
    let data = fs::read(path)?;
    Ok(FontResource::load_with(&data, &config.load_options())?)
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}
