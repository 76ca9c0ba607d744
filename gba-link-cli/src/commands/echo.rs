use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::commands::LinkContext;

/// Send `words` through the firmware's echo command and compare.
pub(crate) fn run_echo(ctx: &LinkContext, words: &[u32]) -> Result<(), CliError> {
    let mut cart = ctx.cartridge()?;
    let received = cart.echo(words)?;

    let mismatches = count_mismatches(words, &received);
    for (sent, got) in words.iter().zip(&received) {
        let status = if sent == got {
            "ok".if_supports_color(Stdout, |t| t.green()).to_string()
        } else {
            "MISMATCH".if_supports_color(Stdout, |t| t.red()).to_string()
        };
        log::info!("  {:08x} -> {:08x}  {}", sent, got, status);
    }

    if mismatches > 0 {
        return Err(CliError::other(format!(
            "{} of {} words came back wrong",
            mismatches,
            words.len()
        )));
    }
    log::info!("All {} words echoed correctly", words.len());
    Ok(())
}

fn count_mismatches(sent: &[u32], received: &[u32]) -> usize {
    let differing = sent.iter().zip(received).filter(|(a, b)| a != b).count();
    differing + sent.len().abs_diff(received.len())
}
