use docedit::app::resolve::{Resolver, ResolverOptions, resolve};
use docedit::domain::model::MatchTier;

const PAPER: &str = "# Results\n\nWe find that\n$$\n  E = mc^2\n$$\nholds for all   inertial frames.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";

#[test]
fn verbatim_fragments_resolve_to_first_occurrence() {
    for fragment in ["We find", "E = mc^2", "| 1 | 2 |", "inertial frames.", "# Results"] {
        let range = resolve(PAPER, fragment).expect("verbatim fragment resolves");
        assert_eq!(range.start, PAPER.find(fragment).unwrap(), "{fragment}");
        assert_eq!(range.text, fragment);
    }
}

#[test]
fn resolved_text_is_always_a_source_slice() {
    let fragments = [
        "We find that $$ E = mc^2 $$ holds",
        "holds for all inertial frames.",
        "Results We find",
        "frames. a b",
        "unrelated Results and frames.",
    ];
    for fragment in fragments {
        if let Some(range) = resolve(PAPER, fragment) {
            assert!(range.start <= range.end && range.end <= PAPER.len());
            assert_eq!(&PAPER[range.start..range.end], range.text, "{fragment}");
        }
    }
}

#[test]
fn rendered_display_math_resolves_through_normalization() {
    let resolution = Resolver::default()
        .resolve_with_tier(PAPER, "holds for all inertial frames.")
        .unwrap();
    assert_eq!(resolution.tier, MatchTier::Normalized);
    assert_eq!(resolution.range.text, "holds for all   inertial frames.");
}

#[test]
fn generated_text_without_anchors_is_not_found() {
    assert!(resolve(PAPER, "zzz_not_present_zzz").is_none());
    assert!(resolve(PAPER, "on p. 3").is_none());
}

#[test]
fn narrow_anchor_window_falls_back_to_projection() {
    let resolver = Resolver::new(ResolverOptions {
        anchor_window: 0,
        min_anchor_word_len: 3,
    });
    let range = resolver.resolve(PAPER, "We find that $$ E").unwrap();
    assert_eq!(range.text, "We find that\n$$\n  E");
}
