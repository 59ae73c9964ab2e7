//! BioNetGen `.net` style text rendering.

use crate::rule::RateLaw;

use super::{Network, Reaction};

/// Renders the species and reaction blocks of a `.net` file. Indices are
/// 1-based; each rate is scaled by the reaction's propensity and volume
/// factors.
pub fn to_net_string(network: &Network) -> String {
    let mut out = String::new();
    out.push_str("begin species\n");
    for (i, species) in network.species.iter().enumerate() {
        out.push_str(&format!("{:>5} {} {}\n", i + 1, species.key, species.initial_amount));
    }
    out.push_str("end species\n");
    out.push_str("begin reactions\n");
    for (i, reaction) in network.reactions.iter().enumerate() {
        out.push_str(&format!(
            "{:>5} {} {} {} #{}\n",
            i + 1,
            indices(&reaction.reactants),
            indices(&reaction.products),
            scaled_rate(reaction),
            reaction.rule_name
        ));
    }
    out.push_str("end reactions\n");
    out
}

fn indices(ids: &[usize]) -> String {
    if ids.is_empty() {
        return "0".to_string();
    }
    ids.iter()
        .map(|id| (id + 1).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn scaled_rate(reaction: &Reaction) -> String {
    let factor = reaction.propensity_factor() * reaction.volume_factor();
    match &reaction.rate {
        RateLaw::Constant(k) => (factor * k).to_string(),
        _ if factor == 1.0 => reaction.rate.to_string(),
        RateLaw::Expression(expr) if expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            format!("{factor}*{expr}")
        }
        RateLaw::Expression(expr) => format!("{factor}*({expr})"),
    }
}
