pub mod config;
pub mod fel;

use std::fmt::Display;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::Colorize;

/// Absolute path of an existing file.
///
/// Keeps the given path when canonicalizing would turn it into a verbatim `\\?\` path,
/// which happens for network drives on Windows.
///
/// # Errors
/// Returns an error if the path is not an existing file.
pub fn resolve_existing_file(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        anyhow::bail!("File does not exist or is not accessible: '{}'", path.display());
    }
    let absolute = dunce::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))?;
    let is_verbatim = |candidate: &Path| candidate.to_string_lossy().starts_with(r"\\?");
    if is_verbatim(&absolute) && !is_verbatim(path) {
        Ok(path.to_path_buf())
    } else {
        Ok(absolute)
    }
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Print a horizontal divider line.
pub fn print_divider(width: usize) {
    println!("{}", "─".repeat(width));
}

/// Print the prompt and read one trimmed line from stdin.
pub fn read_input(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    io::stdin().read_line(&mut input).context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Ask a yes/no question. Empty input returns `default`.
pub fn confirm_with_user(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = read_input(&format!("{question} {} ", hint.dimmed()))?;
    Ok(parse_yes_no(&answer).unwrap_or(default))
}

/// Interpret a yes/no answer in English or Spanish.
#[must_use]
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "s" | "si" | "sí" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a menu selection into zero-based indices.
///
/// Accepts a comma-separated list of 1-based numbers, `a`/`all`/`t` for everything,
/// or `0`/empty for nothing. Numbers outside `1..=count` are dropped.
///
/// ```rust
/// use fel_tools::parse_selection;
///
/// assert_eq!(parse_selection("1, 3", 4).unwrap(), vec![0, 2]);
/// assert_eq!(parse_selection("t", 3).unwrap(), vec![0, 1, 2]);
/// assert!(parse_selection("0", 3).unwrap().is_empty());
/// ```
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.is_empty() || input == "0" {
        return Ok(Vec::new());
    }
    if matches!(input.to_lowercase().as_str(), "a" | "all" | "t") {
        return Ok((0..count).collect());
    }

    let mut indices = Vec::new();
    for part in input.split(',') {
        let number: usize = part
            .trim()
            .parse()
            .with_context(|| format!("Invalid selection: '{}'", part.trim()))?;
        if (1..=count).contains(&number) && !indices.contains(&(number - 1)) {
            indices.push(number - 1);
        }
    }
    Ok(indices)
}

/// Format a number with two decimals and comma thousands separators.
///
/// ```rust
/// use fel_tools::format_amount;
///
/// assert_eq!(format_amount(1234567.891), "1,234,567.89");
/// assert_eq!(format_amount(-2500.0), "-2,500.00");
/// ```
#[must_use]
pub fn format_amount<T: Display>(value: T) -> String {
    let formatted = format!("{value:.2}");
    let (sign, digits) = formatted
        .strip_prefix('-')
        .map_or(("", formatted.as_str()), |rest| ("-", rest));
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}

/// Truncate text to at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell, command_name)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Determine the appropriate directory for storing shell completions.
///
/// First checks if the user-specific directory exists,
/// then checks for the global directory.
/// If neither exist, creates and uses the user-specific dir.
fn get_shell_completion_dir(shell: Shell, name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;

    // Special handling for oh-my-zsh.
    // Create custom "plugin", which will then have to be loaded in .zshrc
    if shell == Shell::Zsh {
        let omz_plugins = home.join(".oh-my-zsh/custom/plugins");
        if omz_plugins.exists() {
            let plugin_dir = omz_plugins.join(name);
            std::fs::create_dir_all(&plugin_dir)?;
            return Ok(plugin_dir);
        }
    }

    let user_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => home.join(".bash_completion.d"),
        Shell::Elvish => home.join(".elvish"),
        Shell::Fish => home.join(".config/fish/completions"),
        Shell::Zsh => home.join(".zsh/completions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }

    let global_dir = match shell {
        Shell::PowerShell => user_dir.clone(),
        Shell::Bash => PathBuf::from("/etc/bash_completion.d"),
        Shell::Fish => PathBuf::from("/usr/share/fish/completions"),
        Shell::Zsh => PathBuf::from("/usr/share/zsh/site-functions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if global_dir.exists() {
        return Ok(global_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}

/// Helper method to assert floating point equality in test cases.
#[inline]
pub fn assert_f64_eq(a: f64, b: f64) {
    let epsilon = 1e-9;
    assert!(
        (a - b).abs() <= epsilon,
        "Values are not equal: {a} and {b} (epsilon = {epsilon})"
    );
}
