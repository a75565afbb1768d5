use std::fmt::Write;

use crate::solution::{Constituent, Solution, Total};

/// Renders one solution block: the ordinal, then per total the input
/// target, the assigned `index: value` lines, and the recomputed sum.
/// `precision` is the number of decimal places shown.
pub fn render_solution(
    ordinal: u64,
    solution: &Solution,
    constituents: &[Constituent],
    totals: &[Total],
    precision: usize,
) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "Unique solution {}", ordinal);
    for total in totals {
        let _ = writeln!(out, "\tInput total: {:.prec$}", total.target, prec = precision);

        let mut calc_total = 0.0;
        for &i in solution.bucket(total.index) {
            calc_total += constituents[i].value;
            let _ = writeln!(
                out,
                "\t\t{}: {:.prec$}",
                i,
                constituents[i].value,
                prec = precision
            );
        }
        let _ = writeln!(out, "\tCalculated total: {:.prec$}\n", calc_total, prec = precision);
    }

    out
}
