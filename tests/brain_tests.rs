#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use std::fs;

use evodrive::error::Error;
use evodrive::simulation::agent::{Accelerate, Action, Turn};
use evodrive::simulation::brain::{Architecture, Brain, matrix};
use ndarray::{Array1, Array2, array};

fn zero_brain(architecture: Architecture) -> Brain {
    let weights = architecture
        .matrix_shapes()
        .into_iter()
        .map(Array2::zeros)
        .collect();
    Brain::from_weights(architecture, weights).unwrap()
}

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("evodrive-{}-{name}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_matrix_shapes() {
    let architecture = Architecture::controller(3, 6);
    assert_eq!(
        architecture.matrix_shapes(),
        vec![(6, 6), (6, 7), (6, 7), (9, 7)]
    );

    let direct = Architecture::controller(0, 6);
    assert_eq!(direct.matrix_shapes(), vec![(9, 6)]);
}

#[test]
fn test_zero_weights_decide_first_action() {
    let brain = zero_brain(Architecture::controller(3, 6));
    let inputs = array![1.0, 90.0, 10.0, 20.0, 30.0];

    let (action, outputs) = brain.decide(&inputs);

    assert_eq!(outputs, Array1::<f32>::zeros(9));
    assert_eq!(action, Action::new(Accelerate::Accelerate, Turn::Left));
}

#[test]
fn test_outputs_are_non_negative() {
    let brain = Brain::new_random(Architecture::controller(3, 6));
    for heading in [0.0, 90.0, 180.0, 270.0] {
        let outputs = brain.output(&array![2.5, heading, 40.0, 300.0, 15.0]);
        assert_eq!(outputs.len(), 9);
        assert!(outputs.iter().all(|&x| x >= 0.0));
    }
}

#[test]
fn test_random_weights_in_range() {
    let brain = Brain::new_random(Architecture::controller(2, 4));
    for weights in brain.weights() {
        assert!(weights.iter().all(|&w| (-1.0..1.0).contains(&w)));
    }
}

#[test]
fn test_bias_column_is_used() {
    // Only the bias of output 4 (IDLE + STRAIGHT) is set.
    let architecture = Architecture::controller(0, 6);
    let mut weights = Array2::zeros((9, 6));
    weights[[4, 5]] = 1.0;
    let brain = Brain::from_weights(architecture, vec![weights]).unwrap();

    let (action, outputs) = brain.decide(&Array1::zeros(5));
    assert_eq!(outputs[4], 1.0);
    assert_eq!(action, Action::new(Accelerate::Idle, Turn::Straight));
}

#[test]
fn test_action_index_mapping() {
    let expected = [
        (Accelerate::Accelerate, Turn::Left),
        (Accelerate::Accelerate, Turn::Straight),
        (Accelerate::Accelerate, Turn::Right),
        (Accelerate::Idle, Turn::Left),
        (Accelerate::Idle, Turn::Straight),
        (Accelerate::Idle, Turn::Right),
        (Accelerate::Decelerate, Turn::Left),
        (Accelerate::Decelerate, Turn::Straight),
        (Accelerate::Decelerate, Turn::Right),
    ];
    for (index, (accelerate, turn)) in expected.into_iter().enumerate() {
        let action = Action::from_index(index);
        assert_eq!(action, Action::new(accelerate, turn));
        assert_eq!(action.index(), index);
    }
}

#[test]
fn test_decide_prefers_lowest_index_on_ties() {
    let outputs = array![0.0, 2.0, 0.5, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    assert_eq!(Action::decide(&outputs).index(), 1);

    let with_nan = array![f32::NAN, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    assert_eq!(Action::decide(&with_nan).index(), 1);
}

#[test]
fn test_crossover_at_cut_point() {
    let parent1 = Array2::from_elem((3, 4), 1.0f32);
    let parent2 = Array2::from_elem((3, 4), 0.0f32);

    let child = matrix::crossover_at(&parent1, &parent2, 1, 2);

    assert_eq!(
        child,
        array![
            [1.0, 1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0]
        ]
    );
}

#[test]
fn test_crossover_takes_each_gene_from_a_parent() {
    let architecture = Architecture::controller(3, 6);
    let parent1 = Brain::new_random(architecture);
    let parent2 = Brain::new_random(architecture);

    let child = Brain::crossover(&parent1, &parent2).unwrap();

    assert_eq!(child.architecture(), architecture);
    for ((c, p1), p2) in child
        .weights()
        .iter()
        .zip(parent1.weights())
        .zip(parent2.weights())
    {
        assert_eq!(c.dim(), p1.dim());
        // A single cut point: a parent1 prefix followed by a parent2 suffix.
        let from_first: Vec<bool> = c
            .iter()
            .zip(p1.iter())
            .zip(p2.iter())
            .map(|((c, a), b)| {
                assert!(c == a || c == b);
                c == a
            })
            .collect();
        assert!(from_first[0]);
        if let Some(switch) = from_first.iter().position(|&first| !first) {
            assert!(from_first[switch..].iter().all(|&first| !first));
        }
    }
}

#[test]
fn test_crossover_rejects_mismatched_architectures() {
    let parent1 = Brain::new_random(Architecture::controller(3, 6));
    let parent2 = Brain::new_random(Architecture::controller(2, 6));

    let result = Brain::crossover_and_mutate(&parent1, &parent2, 0.1);

    assert!(matches!(result, Err(Error::ArchitectureMismatch { .. })));
}

#[test]
fn test_mutation_rate_zero_is_identity() {
    let mut brain = Brain::new_random(Architecture::controller(3, 6));
    let original = brain.clone();

    brain.mutate(0.0);

    assert_eq!(brain, original);
}

#[test]
fn test_full_mutation_stays_in_range() {
    let mut weights = Array2::from_elem((20, 20), 5.0f32);

    matrix::mutate(&mut weights, 1.0);

    assert!(weights.iter().all(|&w| (-1.0..=1.0).contains(&w)));
}

#[test]
fn test_from_weights_rejects_wrong_shapes() {
    let architecture = Architecture::controller(1, 4);

    let wrong_count = Brain::from_weights(architecture, vec![Array2::zeros((4, 6))]);
    assert!(matches!(wrong_count, Err(Error::InvalidArchitecture(_))));

    let wrong_shape = Brain::from_weights(
        architecture,
        vec![Array2::zeros((4, 6)), Array2::zeros((9, 4))],
    );
    assert!(matches!(wrong_shape, Err(Error::InvalidArchitecture(_))));
}

#[test]
fn test_save_and_load_brain() {
    let brain = Brain::new_random(Architecture::controller(3, 6));
    let path = temp_path("brain.json");

    brain.save_to_file(&path).unwrap();
    let loaded = Brain::load_from_file(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(loaded, brain);
    let inputs = array![1.5, 270.0, 12.0, 80.0, 7.0];
    assert_eq!(loaded.output(&inputs), brain.output(&inputs));
}

#[test]
fn test_load_errors() {
    let missing = Brain::load_from_file(&temp_path("does-not-exist.json"));
    assert!(matches!(missing, Err(Error::Io(_))));

    let garbage = Brain::from_json("{ not json");
    assert!(matches!(garbage, Err(Error::Json(_))));

    // Declared architecture disagrees with the stored matrices.
    let brain = Brain::new_random(Architecture::controller(3, 6));
    let mut value: serde_json::Value = serde_json::from_str(&brain.to_json().unwrap()).unwrap();
    value["architecture"]["hidden_nodes"] = serde_json::json!(7);
    let tampered = Brain::from_json(&value.to_string());
    assert!(matches!(tampered, Err(Error::InvalidArchitecture(_))));
}

#[test]
fn test_load_controller_rejects_other_shapes() {
    let brain = Brain::new_random(Architecture {
        inputs: 3,
        hidden_nodes: 4,
        hidden_layers: 1,
        outputs: 2,
    });
    let path = temp_path("not-a-controller.json");
    brain.save_to_file(&path).unwrap();

    // Well formed on its own, but unable to drive an agent.
    let plain = Brain::load_from_file(&path);
    let controller = Brain::load_controller(&path);
    fs::remove_file(&path).ok();

    assert!(plain.is_ok());
    assert!(matches!(controller, Err(Error::InvalidArchitecture(_))));
    assert!(matches!(
        brain.validate_controller(),
        Err(Error::InvalidArchitecture(_))
    ));
    Brain::new_random(Architecture::controller(3, 6))
        .validate_controller()
        .unwrap();
}
