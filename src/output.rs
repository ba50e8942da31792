//! Output formatting for client-side annotation results

use crate::server::RemoteAnnotation;
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The wire format, one annotation per line
    #[default]
    Tab,
    /// One JSON object per annotation
    Json,
    /// The input with matched spans highlighted, followed by the annotations
    Highlight,
}

/// Stdout, colored only when asked for and supported
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print the annotations found in `text`
pub fn print_annotations<W: WriteColor>(
    out: &mut W,
    format: OutputFormat,
    text: &str,
    annotations: &[RemoteAnnotation],
) -> io::Result<()> {
    match format {
        OutputFormat::Tab => {
            for a in annotations {
                writeln!(out, "{}\t{}\t{}\t{}", a.concept_id, a.start, a.end, a.text)?;
            }
        }
        OutputFormat::Json => {
            for a in annotations {
                serde_json::to_writer(&mut *out, a).map_err(io::Error::other)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Highlight => print_highlighted(out, text, annotations)?,
    }
    Ok(())
}

fn print_highlighted<W: WriteColor>(
    out: &mut W,
    text: &str,
    annotations: &[RemoteAnnotation],
) -> io::Result<()> {
    // byte offset of every char boundary, end of text included
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let byte_at = |char_offset: usize| boundaries[char_offset.min(boundaries.len() - 1)];

    let mut covered = vec![false; boundaries.len() - 1];
    for a in annotations {
        let end = a.end.min(covered.len());
        for flag in covered.iter_mut().take(end).skip(a.start) {
            *flag = true;
        }
    }

    let mut chunk_start = 0;
    while chunk_start < covered.len() {
        let highlighted = covered[chunk_start];
        let chunk_end = covered[chunk_start..]
            .iter()
            .position(|&c| c != highlighted)
            .map_or(covered.len(), |len| chunk_start + len);

        if highlighted {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        }
        write!(out, "{}", &text[byte_at(chunk_start)..byte_at(chunk_end)])?;
        if highlighted {
            out.reset()?;
        }
        chunk_start = chunk_end;
    }
    writeln!(out)?;

    for a in annotations {
        write!(out, "  ")?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", a.concept_id)?;
        out.reset()?;
        write!(out, " ")?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "{}..{}", a.start, a.end)?;
        out.reset()?;
        writeln!(out, " {}", a.text)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::{Ansi, NoColor};

    fn annotation(concept_id: u64, start: usize, end: usize, text: &str) -> RemoteAnnotation {
        RemoteAnnotation {
            concept_id,
            start,
            end,
            text: text.to_string(),
        }
    }

    fn render(format: OutputFormat, text: &str, annotations: &[RemoteAnnotation]) -> String {
        let mut out = NoColor::new(Vec::new());
        print_annotations(&mut out, format, text, annotations).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_tab_format() {
        let out = render(
            OutputFormat::Tab,
            "fièvre jaune",
            &[annotation(5, 0, 12, "fièvre jaune")],
        );
        assert_eq!(out, "5\t0\t12\tfièvre jaune\n");
    }

    #[test]
    fn test_json_format() {
        let out = render(OutputFormat::Json, "toux", &[annotation(2, 0, 4, "toux")]);
        let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["concept_id"], 2);
        assert_eq!(value["text"], "toux");
    }

    #[test]
    fn test_highlight_without_color() {
        let out = render(
            OutputFormat::Highlight,
            "Été: toux",
            &[annotation(2, 5, 9, "toux")],
        );
        assert_eq!(out, "Été: toux\n  2 5..9 toux\n");
    }

    #[test]
    fn test_highlight_marks_char_spans() {
        let mut out = Ansi::new(Vec::new());
        print_annotations(
            &mut out,
            OutputFormat::Highlight,
            "Été: toux",
            &[annotation(2, 5, 9, "toux")],
        )
        .unwrap();
        let rendered = String::from_utf8(out.into_inner()).unwrap();
        let first_line = rendered.lines().next().unwrap();
        assert!(first_line.starts_with("Été: \x1b["));
        assert!(first_line.contains("toux"));
    }

    #[test]
    fn test_highlight_tolerates_out_of_range_offsets() {
        let out = render(OutputFormat::Highlight, "toux", &[annotation(1, 2, 40, "ux")]);
        assert!(out.starts_with("toux\n"));
    }
}
