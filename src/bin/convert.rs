use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use gif_favicon::{convert, AnimatedSource, FrameRecolorer};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "gif-favicon-convert",
    about = "Turn an animated GIF logo on a white background into a black background favicon"
)]
struct Opt {
    /// Input animated GIF.
    #[structopt(parse(from_os_str), default_value = "MOT.gif")]
    input: PathBuf,

    /// Output favicon GIF.
    #[structopt(parse(from_os_str), default_value = "MOT-favicon.gif")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    println!("Processing {}...", opt.input.display());
    let source = AnimatedSource::open(&opt.input)?;

    let recolorer = FrameRecolorer::default();
    let animation = convert(&source, &recolorer)?;
    println!("Processed {} frames", animation.len());

    animation.save(&opt.output)?;
    println!(
        "Created {} at {}x{}",
        opt.output.display(),
        animation.size(),
        animation.size()
    );

    Ok(())
}
