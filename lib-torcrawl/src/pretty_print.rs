//! Colored terminal rendering of crawl outcomes.

use ansi_term::Color::{self, Blue, Green, Purple, Red, White, Yellow};
use async_trait::async_trait;
use http::StatusCode;

use crate::crawler::{Node, Record, Sink};

fn color_for_code(code: u16) -> Color {
    let Ok(status) = StatusCode::from_u16(code) else {
        // The fetch-failure sentinel and anything else out of range.
        return Red;
    };

    if status.is_informational() {
        White
    } else if status.is_success() {
        Green
    } else if status.is_redirection() {
        Blue
    } else if status.is_client_error() {
        Yellow
    } else if status.is_server_error() {
        Red
    } else {
        Purple
    }
}

fn paint_status(code: u16, status: &str) -> String {
    color_for_code(code)
        .bold()
        .paint(format!("{} {}", code, status))
        .to_string()
}

/// List mode on a terminal: one colored status line per crawled link.
pub struct PrintSink;

#[async_trait]
impl Sink for PrintSink {
    async fn publish(&self, record: Record) -> Result<(), anyhow::Error> {
        println!(
            "Link: {:<60} Status: {}",
            record.url,
            paint_status(record.status_code, &record.status),
        );
        Ok(())
    }
}

/// Prints a crawled tree with two-space indentation per depth level.
pub fn print_tree(node: &Node) {
    fn print_level(node: &Node, indent: usize) {
        println!(
            "{}{} {}",
            "  ".repeat(indent),
            color_for_code(node.status_code).bold().paint(format!("⏺ {}", node.status_code)),
            node.url,
        );
        for child in &node.children {
            print_level(child, indent + 1);
        }
    }

    print_level(node, 0);
}
