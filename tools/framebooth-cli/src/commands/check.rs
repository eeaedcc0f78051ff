//! Check encoder availability.

use framebooth_render_engine::encoder::{
    command_exists, pick_candidate, probe_encoders, CODEC_CANDIDATES,
};

pub fn run() -> anyhow::Result<()> {
    println!("Framebooth System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = command_exists("ffmpeg");
    let ffprobe = command_exists("ffprobe");
    println!(
        "[{}] ffmpeg in PATH",
        if ffmpeg { "OK" } else { "MISSING" }
    );
    println!(
        "[{}] ffprobe in PATH",
        if ffprobe { "OK" } else { "MISSING" }
    );

    if !ffmpeg {
        println!();
        println!("Video export is unavailable without ffmpeg.");
        return Ok(());
    }

    let supported = probe_encoders()?;
    println!();
    println!("Codec candidates (preference order):");
    for candidate in CODEC_CANDIDATES {
        let available = supported.contains(candidate.encoder);
        println!(
            "  [{}] {}/{}{}",
            if available { "OK" } else { "--" },
            candidate.container,
            candidate.encoder,
            if candidate.interoperable {
                " (no transcode needed)"
            } else {
                ""
            }
        );
    }

    println!();
    match pick_candidate(&supported) {
        Some(candidate) => println!(
            "Video export will record {}/{}.",
            candidate.container, candidate.encoder
        ),
        None => println!("No viable codec/container combination; video export will fail fast."),
    }

    Ok(())
}
