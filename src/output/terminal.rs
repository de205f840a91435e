// Colored terminal output for briefs, cannibalization, validation and drag
// reports.
//
// This module handles all terminal-specific formatting. The main.rs command
// handlers delegate here.

use colored::Colorize;

use crate::brief::{BriefRow, CoverageStatus, KeywordCoverage, TierCoverage};
use crate::drag::{DragResult, StopReason};
use crate::nlp::taxonomy::format_category_hierarchy;
use crate::pipeline::{ClusterReport, ValidationReport};

/// Display the strategic brief, one block per cluster.
pub fn display_brief(rows: &[BriefRow]) {
    if rows.is_empty() {
        println!("No clusters produced.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Strategic Brief ({} clusters) ===", rows.len()).bold()
    );

    for row in rows {
        println!();
        println!(
            "  {} {}  {}",
            format!("#{}", row.cluster_id).dimmed(),
            row.hub_keyword.bold(),
            format!(
                "({} keywords, volume {:.0}, coherence {:.2})",
                row.total_keywords, row.total_volume, row.coherence
            )
            .dimmed(),
        );

        let category = row.detected_category.as_deref().unwrap_or("none detected");
        match row.matches_target {
            Some(true) => println!(
                "    Category: {} {}",
                category.green(),
                format!("[{:.0}% for target]", row.confidence * 100.0).green()
            ),
            Some(false) => println!(
                "    Category: {} {}",
                category.yellow(),
                "[does not match target]".red()
            ),
            None => println!("    Category: {} ({:.0}%)", category, row.confidence * 100.0),
        }

        println!("    Primary:   {}", row.primary_keywords);
        if !row.secondary_keywords.is_empty() {
            println!(
                "    Secondary: {}",
                super::truncate_chars(&row.secondary_keywords, 100)
            );
        }
        if row.tertiary_count() > 0 {
            println!("    Tertiary:  {}", row.tertiary_keywords.dimmed());
        }
        if !row.top_entities.is_empty() {
            println!("    Entities:  {}", row.top_entities.dimmed());
        }
    }
    println!();
}

/// Display cannibalization pairs by hub keyword.
pub fn display_cannibalization(report: &ClusterReport) {
    if report.cannibalization.is_empty() {
        println!("  {} No cannibalization detected", "ok".green());
        return;
    }

    println!(
        "\n{}",
        format!(
            "=== Potential Cannibalization ({} pairs) ===",
            report.cannibalization.len()
        )
        .bold()
    );
    for pair in &report.cannibalization {
        let hub_a = report.hub_keyword(pair.cluster_a_id).unwrap_or("?");
        let hub_b = report.hub_keyword(pair.cluster_b_id).unwrap_or("?");
        println!(
            "  {} '{}' <-> '{}' (similarity {:.0}%) consider merging",
            "!".yellow(),
            hub_a,
            hub_b,
            pair.similarity * 100.0
        );
    }
    println!();
}

/// Display a draft validation report.
pub fn display_validation(report: &ValidationReport) {
    println!("\n{}", "=== Draft Validation ===".bold());
    println!("  Words: {}", report.word_count);

    if let Some(prediction) = &report.prediction {
        println!(
            "  Brief predicted: {} ({:.0}%) for cluster '{}'",
            prediction
                .detected_category
                .as_deref()
                .unwrap_or("n/a"),
            prediction.confidence * 100.0,
            prediction.hub_keyword
        );
    }

    let category = &report.category;
    let detected = category.detected_category.as_deref().unwrap_or("none detected");
    if category.matches_target {
        println!(
            "  {} Draft matches target: {} ({:.0}%)",
            "ok".green(),
            category.matched_category.as_deref().unwrap_or(detected),
            category.confidence * 100.0
        );
    } else {
        println!(
            "  {} Draft does not match {}: detected {} ({:.0}%)",
            "x".red(),
            category.target_category,
            detected.yellow(),
            category.confidence * 100.0
        );
    }

    if report.performance_gap {
        println!(
            "  {} Performance gap: the keywords predicted a different category than the draft shows",
            "!".yellow().bold()
        );
    }

    if !category.top_categories.is_empty() {
        println!("\n  Detected categories:");
        for c in &category.top_categories {
            println!("    {:<50} {:.0}%", c.name, c.confidence * 100.0);
        }
    }

    if !report.entities.is_empty() {
        println!("\n  Top entities (by salience):");
        for e in report.entities.iter().take(10) {
            println!(
                "    {:<30} {:.3}  {}",
                e.name,
                e.salience,
                e.entity_type.dimmed()
            );
        }
    }

    if let Some(coverage) = &report.coverage {
        display_coverage(coverage);
    }

    if let Some(drag) = &report.drag {
        display_drag(drag);
    }
    println!();
}

fn display_coverage(coverage: &KeywordCoverage) {
    println!("\n  Keyword coverage:");
    print_tier("Primary", &coverage.primary, coverage.primary_status());
    print_tier("Secondary", &coverage.secondary, coverage.secondary_status());
}

fn print_tier(label: &str, tier: &TierCoverage, status: CoverageStatus) {
    println!(
        "    {} {:<10} {:.0}% ({}/{})",
        colorize_status(status),
        label,
        tier.percentage * 100.0,
        tier.found,
        tier.total
    );
    if !tier.missing.is_empty() {
        println!("      missing: {}", tier.missing.join(", ").dimmed());
    }
}

/// Display the drag search trace and its two removal lists.
pub fn display_drag(result: &DragResult) {
    println!("\n{}", "=== Drag Analysis ===".bold());

    if result.stop_reason == StopReason::NoTermsToTest {
        println!("  No terms to test.");
        return;
    }

    println!(
        "  Target {}: {:.1}% -> {:.1}% ({:+.1} points)",
        result.target_category,
        result.baseline_confidence * 100.0,
        result.final_confidence * 100.0,
        result.total_improvement() * 100.0
    );
    println!(
        "  Tested {} official keywords and {} other terms",
        result.official_count, result.other_count
    );

    if !result.iterations.is_empty() {
        println!();
        for it in &result.iterations {
            let tag = if it.is_official_keyword {
                "A".red().bold()
            } else {
                "B".cyan()
            };
            println!(
                "  {:>2}. [{}] remove '{}'  {:.1}% -> {:.1}% ({:+.1})",
                it.sequence_number,
                tag,
                it.removed_term,
                it.confidence_before * 100.0,
                it.confidence_after * 100.0,
                it.improvement * 100.0
            );
        }
    }

    if !result.removed_official.is_empty() {
        println!(
            "\n  {} List A: official keywords are dragging the draft down",
            "!!".red().bold()
        );
        println!("     {}", result.removed_official.join(", "));
        println!(
            "     {}",
            "The keyword strategy itself may be off-target for this category.".dimmed()
        );
    }
    if !result.removed_other.is_empty() {
        println!("\n  {} List B: incidental terms to clean up", "~".yellow());
        println!("     {}", result.removed_other.join(", "));
    }

    if result.oracle_failures > 0 {
        println!(
            "\n  {} {} trials skipped after classifier errors",
            "!".yellow(),
            result.oracle_failures
        );
    }
    println!("  Stopped: {}", result.stop_reason.describe().dimmed());
}

/// Display categories as an indented tree.
pub fn display_categories(categories: &[&str]) {
    if categories.is_empty() {
        println!("No matching categories.");
        return;
    }
    for category in categories {
        println!("  {}", format_category_hierarchy(category));
    }
}

fn colorize_status(status: CoverageStatus) -> colored::ColoredString {
    match status {
        CoverageStatus::Good => "ok".green(),
        CoverageStatus::Warning => "~".yellow(),
        CoverageStatus::Poor => "x".red(),
    }
}
