/// One entry of an ordered rule table.
///
/// Rules are evaluated top to bottom. A matching terminal rule discards
/// anything collected so far and stops evaluation.
pub struct Rule<I> {
    pub predicate: fn(&I) -> bool,
    pub outcome: &'static str,
    pub terminal: bool,
}

impl<I> Rule<I> {
    pub const fn terminal(predicate: fn(&I) -> bool, outcome: &'static str) -> Self {
        Rule {
            predicate,
            outcome,
            terminal: true,
        }
    }

    pub const fn additive(predicate: fn(&I) -> bool, outcome: &'static str) -> Self {
        Rule {
            predicate,
            outcome,
            terminal: false,
        }
    }
}

/// Collect the outcomes of every matching rule, honouring terminal rules.
pub fn evaluate<I>(rules: &[Rule<I>], input: &I) -> Vec<&'static str> {
    let mut outcomes = Vec::new();
    for rule in rules {
        if (rule.predicate)(input) {
            if rule.terminal {
                return vec![rule.outcome];
            }
            outcomes.push(rule.outcome);
        }
    }
    outcomes
}

/// Outcome of the first matching rule, if any.
pub fn first_match<I>(rules: &[Rule<I>], input: &I) -> Option<&'static str> {
    rules
        .iter()
        .find(|rule| (rule.predicate)(input))
        .map(|rule| rule.outcome)
}
