//! Integration tests for whole-tree simulation runs.

use phylosim_sim::base::{Sequence, SequenceType};
use phylosim_sim::evolution::{
    FixedMatrix, ModelDefinition, RateConfig, SiteRateAssignment, TransitionMatrix,
    ROW_SUM_TOLERANCE,
};
use phylosim_sim::output::{AlignmentFormat, AlignmentWriter, MemorySink};
use phylosim_sim::simulation::{SimulationBuilder, Simulator};
use phylosim_sim::tree::PhyloTree;
use std::sync::Arc;

const THREE_TAXA: &str = "((A:0.3,B:0.2):0.1,C:0.4);";

fn dna(text: &str) -> Sequence {
    Sequence::from_symbols(text, SequenceType::Dna).unwrap()
}

/// Balanced binary tree with `2^depth` leaves named `T0`, `T1`, ...
fn balanced_newick(depth: u32) -> String {
    fn node(depth: u32, next: &mut usize) -> String {
        if depth == 0 {
            let name = format!("T{next}");
            *next += 1;
            return format!("{name}:0.05");
        }
        let left = node(depth - 1, next);
        let right = node(depth - 1, next);
        format!("({left},{right}):0.05")
    }
    let mut next = 0;
    let body = node(depth, &mut next);
    // drop the root branch length
    let body = body.trim_end_matches(":0.05");
    format!("{body};")
}

fn absorbing_dna(target: usize) -> FixedMatrix {
    let rows: Vec<Vec<f64>> = (0..4)
        .map(|_| (0..4).map(|j| if j == target { 1.0 } else { 0.0 }).collect())
        .collect();
    FixedMatrix::new(TransitionMatrix::from_rows(&rows).unwrap(), vec![0.25; 4]).unwrap()
}

fn phylip_bytes(sim: &mut Simulator, tree: &PhyloTree) -> Vec<u8> {
    let mut writer = AlignmentWriter::new(Vec::new(), AlignmentFormat::Phylip, SequenceType::Dna);
    sim.run(tree, &mut writer).unwrap();
    writer.into_inner()
}

#[test]
fn test_all_invariant_sites_keep_the_ancestral_sequence() {
    let tree = PhyloTree::from_newick(THREE_TAXA).unwrap();
    let mut sim = SimulationBuilder::new()
        .model("JC+I{1}")
        .ancestral_sequence("AAAA")
        .seed(5)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    let stats = sim.run(&tree, &mut sink).unwrap();

    assert_eq!(stats.invariant_sites, 4);
    for (name, seq) in sink.leaves() {
        assert_eq!(seq, &dna("AAAA"), "leaf {name}");
    }
}

#[test]
fn test_absorbing_model_sends_every_leaf_to_one_state() {
    let tree = PhyloTree::from_newick(THREE_TAXA).unwrap();
    let mut sim = SimulationBuilder::new()
        .substitution_model(Arc::new(absorbing_dna(3)), RateConfig::default())
        .sequence_length(25)
        .seed(11)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    sim.run(&tree, &mut sink).unwrap();

    assert_eq!(sink.leaves().len(), 3);
    for (_, seq) in sink.leaves() {
        assert_eq!(seq.to_symbols(SequenceType::Dna), "T".repeat(25));
    }
}

#[test]
fn test_seeded_runs_are_byte_identical() {
    let tree = PhyloTree::from_newick(THREE_TAXA).unwrap();
    let build = |seed| {
        SimulationBuilder::new()
            .model("GTR{1,2,1,1,2,1}+F{0.3,0.2,0.2,0.3}+I{0.2}+G4{0.7}")
            .sequence_length(100)
            .seed(seed)
            .build()
            .unwrap()
    };

    let first = phylip_bytes(&mut build(42), &tree);
    let second = phylip_bytes(&mut build(42), &tree);
    assert_eq!(first, second);
    assert!(String::from_utf8(first.clone()).unwrap().starts_with("3 100\n"));

    let other = phylip_bytes(&mut build(43), &tree);
    assert_ne!(first, other);

    let mut sim = build(7);
    sim.reseed(42);
    assert_eq!(phylip_bytes(&mut sim, &tree), first);
}

#[test]
fn test_invariant_sites_never_change() {
    let tree = PhyloTree::from_newick("((A:3,B:3):3,(C:3,D:3):3);").unwrap();
    let mut sim = SimulationBuilder::new()
        .model("JC+I{0.5}+G4{0.5}")
        .sequence_length(400)
        .seed(3)
        .build()
        .unwrap();
    let root = sim.ancestral_sequence().unwrap();
    let mut sink = MemorySink::new();
    let stats = sim.simulate_sequences(&tree, &root, &mut sink).unwrap();

    let unchanged = (0..root.len())
        .filter(|&i| sink.leaves().iter().all(|(_, s)| s.get(i) == root.get(i)))
        .count();
    assert!(stats.invariant_sites > 0);
    assert!(unchanged >= stats.invariant_sites);
}

#[test]
fn test_flagged_invariant_sites_match_the_root_at_every_leaf() {
    let tree = PhyloTree::from_newick("((A:2,B:2):2,((C:2,D:2):1,E:3):2);").unwrap();
    let build = || {
        SimulationBuilder::new()
            .model("JC+I{0.4}")
            .sequence_length(500)
            .seed(21)
            .build()
            .unwrap()
    };

    // Same seed: the root and the site draw replay those of the run below.
    let mut replay = build();
    let root = replay.ancestral_sequence().unwrap();
    let SiteRateAssignment::Invariant(flags) = replay.site_rates(root.len()).unwrap() else {
        panic!("expected an invariant-only assignment");
    };
    let flagged = flags.iter().filter(|&&f| f).count();
    assert!((150..250).contains(&flagged), "{flagged}");

    let mut sim = build();
    let mut sink = MemorySink::new();
    let stats = sim.run(&tree, &mut sink).unwrap();
    assert_eq!(stats.invariant_sites, flagged);
    assert_eq!(sink.leaves().len(), 5);

    for (name, seq) in sink.leaves() {
        for (site, &invariant) in flags.iter().enumerate() {
            if invariant {
                assert_eq!(seq.get(site), root.get(site), "{name} changed at site {site}");
            }
        }
    }
    let changed = (0..root.len())
        .filter(|&i| !flags[i])
        .filter(|&i| sink.leaves().iter().any(|(_, s)| s.get(i) != root.get(i)))
        .count();
    assert!(changed > 0);
}

#[test]
fn test_streaming_keeps_few_sequences_alive() {
    let tree = PhyloTree::from_newick(&balanced_newick(6)).unwrap();
    assert_eq!(tree.num_leaves(), 64);
    let run = |streaming: bool| {
        let mut sim = SimulationBuilder::new()
            .model("HKY{2}")
            .sequence_length(50)
            .streaming(streaming)
            .seed(1)
            .build()
            .unwrap();
        let mut sink = MemorySink::new();
        let stats = sim.run(&tree, &mut sink).unwrap();
        assert_eq!(stats.leaves_written, 64);
        (stats, sink.into_leaves())
    };

    let (streamed, streamed_leaves) = run(true);
    assert!(
        streamed.peak_live_sequences <= tree.depth() + 2,
        "peak {} for depth {}",
        streamed.peak_live_sequences,
        tree.depth()
    );

    let (buffered, buffered_leaves) = run(false);
    assert!(buffered.peak_live_sequences >= 64);
    assert_eq!(streamed_leaves, buffered_leaves);
}

#[test]
fn test_deep_caterpillar_tree() {
    let mut newick = String::from("L0:0.01");
    for i in 1..3000 {
        newick = format!("({newick},L{i}:0.01):0.01");
    }
    newick.push(';');
    let tree = PhyloTree::from_newick(&newick).unwrap();
    let mut sim = SimulationBuilder::new()
        .model("JC")
        .sequence_length(8)
        .seed(2)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    let stats = sim.run(&tree, &mut sink).unwrap();
    assert_eq!(stats.leaves_written, 3000);
}

#[test]
fn test_fundi_swaps_sites_between_the_pair() {
    // A and B are the last leaves of the walk, so both runs draw the same
    // sequences up to the swap.
    let tree = PhyloTree::from_newick("(C:0.5,(A:0.5,B:0.5):0.5);").unwrap();
    let run = |fundi: bool| {
        let mut builder = SimulationBuilder::new()
            .model("JC")
            .sequence_length(100)
            .seed(21);
        if fundi {
            builder = builder.fundi(vec!["A".into(), "B".into()], 0.25);
        }
        let mut sink = MemorySink::new();
        let stats = builder.build().unwrap().run(&tree, &mut sink).unwrap();
        (stats, sink)
    };

    let (plain_stats, plain) = run(false);
    let (fundi_stats, swapped) = run(true);
    assert_eq!(plain_stats.fundi_swapped_sites, 0);
    assert_eq!(fundi_stats.fundi_swapped_sites, 25);
    assert_eq!(swapped.get("C"), plain.get("C"));

    let (a, b) = (plain.get("A").unwrap(), plain.get("B").unwrap());
    let (a2, b2) = (swapped.get("A").unwrap(), swapped.get("B").unwrap());
    let mut exchanged = 0;
    for i in 0..100 {
        let before = (a.get(i), b.get(i));
        let after = (a2.get(i), b2.get(i));
        if after == before {
            continue;
        }
        assert_eq!(after, (before.1, before.0), "site {i}");
        exchanged += 1;
    }
    assert!(exchanged <= 25);
    assert_eq!(a.hamming_distance(b), a2.hamming_distance(b2));
}

#[test]
fn test_fundi_with_unknown_taxon_fails() {
    let tree = PhyloTree::from_newick(THREE_TAXA).unwrap();
    let mut sim = SimulationBuilder::new()
        .sequence_length(10)
        .fundi(vec!["A".into(), "Z".into()], 0.1)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    assert!(sim.run(&tree, &mut sink).is_err());
}

#[test]
fn test_branch_override_stays_on_its_edge() {
    let tree = PhyloTree::from_newick("((A[&model=ABSORB]:0.5,B:0):0,C:0);").unwrap();
    let mut sim = SimulationBuilder::new()
        .branch_substitution_model("ABSORB", Arc::new(absorbing_dna(2)), 0.0)
        .ancestral_sequence("AAAAAAAA")
        .seed(4)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    sim.run(&tree, &mut sink).unwrap();

    assert_eq!(sink.get("A"), Some(&dna("GGGGGGGG")));
    assert_eq!(sink.get("B"), Some(&dna("AAAAAAAA")));
    assert_eq!(sink.get("C"), Some(&dna("AAAAAAAA")));
}

#[test]
fn test_override_on_internal_edge_reaches_descendants_through_their_parent() {
    let tree = PhyloTree::from_newick("((A:0,B:0)[&model=ABSORB]:0.5,C:0);").unwrap();
    let mut sim = SimulationBuilder::new()
        .branch_substitution_model("ABSORB", Arc::new(absorbing_dna(1)), 0.0)
        .ancestral_sequence("ACGT")
        .seed(4)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    sim.run(&tree, &mut sink).unwrap();

    assert_eq!(sink.get("A"), Some(&dna("CCCC")));
    assert_eq!(sink.get("B"), Some(&dna("CCCC")));
    assert_eq!(sink.get("C"), Some(&dna("ACGT")));
}

#[test]
fn test_override_invariant_sites_are_drawn_per_edge() {
    let tree = PhyloTree::from_newick("(A[&model=ABSORB]:1,B[&model=ABSORB]:1);").unwrap();
    let mut sim = SimulationBuilder::new()
        .branch_substitution_model("ABSORB", Arc::new(absorbing_dna(3)), 0.5)
        .ancestral_sequence(&"A".repeat(200))
        .seed(8)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    sim.run(&tree, &mut sink).unwrap();

    let a = sink.get("A").unwrap();
    let b = sink.get("B").unwrap();
    for seq in [a, b] {
        assert!(seq.as_slice().iter().all(|&s| s == 0 || s == 3));
        let changed = seq.as_slice().iter().filter(|&&s| s == 3).count();
        assert!((50..150).contains(&changed), "{changed}");
    }
    assert_ne!(a, b);
}

#[test]
fn test_deficient_rows_use_the_fallback() {
    let rows = vec![vec![0.5, 0.3], vec![0.3, 0.5]];
    let model = FixedMatrix::new(TransitionMatrix::from_rows(&rows).unwrap(), vec![0.5, 0.5])
        .unwrap();
    let tree = PhyloTree::from_newick(THREE_TAXA).unwrap();
    let mut sim = SimulationBuilder::new()
        .sequence_type(SequenceType::Binary)
        .substitution_model(Arc::new(model), RateConfig::default())
        .sequence_length(500)
        .seed(6)
        .build()
        .unwrap();
    let mut sink = MemorySink::new();
    let stats = sim.run(&tree, &mut sink).unwrap();
    assert!(stats.sampling_fallbacks > 0);
}

#[test]
fn test_parsed_models_are_row_stochastic() {
    let models = [
        ("JC", SequenceType::Dna),
        ("K2P{4}", SequenceType::Dna),
        ("HKY{2}+F{0.1,0.2,0.3,0.4}", SequenceType::Dna),
        ("GTR{1,5,0.5,0.8,6,1}+FQ", SequenceType::Dna),
        ("JC", SequenceType::Binary),
        ("GTR2", SequenceType::Binary),
        ("JC", SequenceType::Protein),
    ];
    for (text, seq_type) in models {
        let definition = ModelDefinition::parse(text, seq_type).unwrap();
        let model = definition.substitution();
        let mut matrix = TransitionMatrix::new(model.num_states());
        for time in [0.0, 1e-6, 0.01, 0.5, 3.0, 50.0] {
            model.compute_trans_matrix(time, &mut matrix);
            assert!(matrix.is_row_stochastic(ROW_SUM_TOLERANCE), "{text} at t = {time}");
        }
    }
}
