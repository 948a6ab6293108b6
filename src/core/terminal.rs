use console::{Emoji, style};

use crate::core::progress::{Phase, ProgressiveResult};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_step(step: &str) {
    println!("{} {}", SPARKLE, style(step).bold());
}

pub fn print_link(label: &str, url: &str) {
    println!(
        "  {} {}: {}",
        GLOBE,
        style(label).bold(),
        style(url).underlined().cyan()
    );
}

/// A titled block of `command  description` rows for the help screen.
pub struct GuideSection {
    title: String,
    rows: Vec<(String, String)>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, description: &str) -> Self {
        self.rows.push((name.to_string(), description.to_string()));
        self
    }

    pub fn print(&self) {
        println!("\n {}", style(&self.title).bold().underlined());
        let width = self.rows.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, description) in &self.rows {
            println!(
                "   {}  {}",
                style(format!("{name:<width$}")).green(),
                style(description).dim()
            );
        }
    }
}

/// One line describing where a generation stands, e.g.
/// `[#####.....]  50%  Building your action plan`.
pub fn progress_line(state: &ProgressiveResult) -> String {
    let pct = state.processing_status.progress.min(100) as usize;
    let filled = pct / 10;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(10 - filled));
    format!(
        "[{}] {:>3}%  {}",
        bar, pct, state.processing_status.current_task
    )
}

pub fn print_progress(state: &ProgressiveResult) {
    let line = progress_line(state);
    match state.phase {
        Phase::Failed => println!("  {}", style(line).red()),
        Phase::Complete => println!("  {}", style(line).green().bold()),
        _ => println!("  {}", style(line).cyan()),
    }
}

pub fn print_banner() {
    let lines: &[&str] = &[
        "   _                       _       _    ___ ",
        "  (_)_   _ _ __ ___  _ __ (_)_ __ / \\  |_ _|",
        "  | | | | | '_ ` _ \\| '_ \\| | '_ \\ _ \\  | | ",
        "  | | |_| | | | | | | |_) | | | | / \\ \\ | | ",
        " _/ |\\__,_|_| |_| |_| .__/|_|_| |_/ \\_\\___|",
        "|__/                |_|                    ",
    ];

    let stops: [(u8, u8, u8); 3] = [(251, 146, 60), (244, 114, 182), (129, 140, 248)];
    let max_w = 44u32;
    let max_d = max_w + 5 * 10;

    println!();
    for (y, line) in lines.iter().enumerate() {
        for (x, ch) in line.chars().enumerate() {
            if ch == ' ' {
                print!(" ");
                continue;
            }
            let d = ((x as u32 + y as u32 * 10) * 1000 / max_d).min(1000);
            let (r, g, b) = if d <= 500 {
                lerp_color(stops[0], stops[1], d * 2)
            } else {
                lerp_color(stops[1], stops[2], (d - 500) * 2)
            };
            print!("\x1b[38;2;{};{};{}m{}", r, g, b, ch);
        }
        println!();
    }
    print!("\x1b[0m");

    println!("\x1b[38;2;129;140;248mYour next AI jump, planned step by step.\x1b[0m\n");
}

fn lerp_color(a: (u8, u8, u8), b: (u8, u8, u8), t: u32) -> (u8, u8, u8) {
    let r = (a.0 as u32 * (1000 - t) + b.0 as u32 * t) / 1000;
    let g = (a.1 as u32 * (1000 - t) + b.1 as u32 * t) / 1000;
    let b_val = (a.2 as u32 * (1000 - t) + b.2 as u32 * t) / 1000;
    (r as u8, g as u8, b_val as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_renders_bar() {
        let mut state = ProgressiveResult::default();
        state.processing_status.progress = 50;
        state.processing_status.current_task = "Building your action plan".to_string();
        assert_eq!(progress_line(&state), "[#####.....]  50%  Building your action plan");

        state.processing_status.progress = 100;
        assert!(progress_line(&state).starts_with("[##########] 100%"));
    }

    #[test]
    fn lerp_hits_endpoints() {
        assert_eq!(lerp_color((0, 0, 0), (200, 100, 50), 0), (0, 0, 0));
        assert_eq!(lerp_color((0, 0, 0), (200, 100, 50), 1000), (200, 100, 50));
    }
}
