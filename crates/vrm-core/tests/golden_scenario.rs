// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Golden Reference Scenarios
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fixed scenarios with reference values computed independently of this
//! crate (closed-form prism sums and midpoint quadrature).

use ndarray::{array, Array1, Array2, ArrayView2};
use vrm_core::mesh::TensorMesh;
use vrm_core::problem::{LinearVrm, LogUniformVrm, VrmProblem};
use vrm_core::sources::MagDipoleSource;
use vrm_core::survey::{Receiver, Source, Survey};
use vrm_core::waveform::{StepOffWaveform, Waveform};
use vrm_types::config::{SurveyConfig, VrmConfig};
use vrm_types::field::{Component, FieldType};

const REL_TOL: f64 = 1e-9;

fn assert_rel(got: f64, expected: f64, tol: f64) {
    let rel = (got - expected).abs() / expected.abs();
    assert!(rel < tol, "got {got}, expected {expected} (rel {rel:e})");
}

/// Spatially uniform inducing field.
struct UniformFieldSource {
    field: [f64; 3],
    receivers: Vec<Receiver>,
    waveform: StepOffWaveform,
}

impl Source for UniformFieldSource {
    fn location(&self) -> [f64; 3] {
        [0.0; 3]
    }

    fn h0(&self, points: ArrayView2<f64>) -> Array2<f64> {
        Array2::from_shape_fn((points.nrows(), 3), |(_, c)| self.field[c])
    }

    fn receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    fn waveform(&self) -> &dyn Waveform {
        &self.waveform
    }
}

fn no_refinement() -> VrmConfig {
    VrmConfig {
        ref_factor: 0,
        ref_radius: Some(vec![]),
    }
}

// ── 2×2×2 block under a vertical receiver ────────────────────────────

#[test]
fn eight_cell_block_matches_reference_row() {
    let mesh = TensorMesh::uniform([2, 2, 2], [2.0; 3], [-2.0; 3]).unwrap();
    let rx = Receiver::new(
        array![[0.0, 0.0, 4.0]],
        Component::Z,
        vec![1e-3],
        FieldType::DhDt,
    )
    .unwrap();
    let source = UniformFieldSource {
        field: [0.0, 0.0, 1.0],
        receivers: vec![rx],
        waveform: StepOffWaveform::default(),
    };
    let mut problem = VrmProblem::new(mesh, &no_refinement()).unwrap();
    problem.pair(Survey::new(vec![Box::new(source)]));

    let expected = [
        0.0080713065451999,
        0.008071306877236322,
        0.008071306877236374,
        0.008071307209272727,
        0.025720122510554517,
        0.025720123507061245,
        0.025720123507061255,
        0.02572012450356801,
    ];
    let a = problem.geometry().unwrap().to_dense();
    assert_eq!(a.dim(), (1, 8));
    for (cell, &e) in expected.iter().enumerate() {
        assert_rel(a[[0, cell]], e, REL_TOL);
    }
}

// ── Refinement convergence ───────────────────────────────────────────

/// Single unit cell at the origin, dipole and receiver 1.5 above its center.
fn single_cell_column(level: usize) -> f64 {
    let mesh = TensorMesh::new(vec![vec![1.0]; 3], [-0.5; 3]).unwrap();
    let rx = Receiver::new(
        array![[0.0, 0.0, 1.5]],
        Component::Z,
        vec![1e-3],
        FieldType::DbDt,
    )
    .unwrap();
    let source = MagDipoleSource::new(
        [0.0, 0.0, 1.5],
        [0.0, 0.0, 1.0],
        StepOffWaveform::default(),
        vec![rx],
    )
    .unwrap();
    let config = VrmConfig {
        ref_factor: level,
        ref_radius: Some(vec![10.0, 20.0, 30.0, 40.0]),
    };
    let mut problem = VrmProblem::new(mesh, &config).unwrap();
    problem.pair(Survey::new(vec![Box::new(source)]));
    let a = problem.geometry().unwrap();
    a.blocks()[0][[0, 0]]
}

#[test]
fn refinement_converges_toward_fine_reference() {
    let expected = [
        0.002139008992806255,
        0.0028675871154541727,
        0.0032080552922703733,
        0.0033121572530188373,
        0.0033393746328181377,
    ];
    // Level-5 value, beyond the configurable factor.
    let reference = 0.0033460414663585973;

    let values: Vec<f64> = (0..expected.len()).map(single_cell_column).collect();
    for (got, &e) in values.iter().zip(expected.iter()) {
        assert_rel(*got, e, REL_TOL);
    }
    let errors: Vec<f64> = values.iter().map(|v| (v - reference).abs()).collect();
    for pair in errors.windows(2) {
        assert!(pair[1] < pair[0], "refinement error grew: {errors:?}");
    }
}

// ── Decay laws ───────────────────────────────────────────────────────

fn dipole_survey() -> Survey {
    let rx = Receiver::new(
        array![[0.0, 0.0, 1.0], [0.5, -0.5, 1.0]],
        Component::Z,
        vec![1e-4, 1e-3, 1e-2],
        FieldType::DbDt,
    )
    .unwrap();
    let source = MagDipoleSource::new(
        [0.0, 0.0, 1.0],
        [0.0, 0.0, 1.0],
        StepOffWaveform::default(),
        vec![rx],
    )
    .unwrap();
    Survey::new(vec![Box::new(source)])
}

fn small_mesh() -> TensorMesh {
    TensorMesh::uniform([3, 3, 2], [1.0; 3], [-1.5, -1.5, -2.0]).unwrap()
}

#[test]
fn wide_log_uniform_band_matches_linear_law() {
    let config = VrmConfig {
        ref_factor: 1,
        ref_radius: Some(vec![1.2]),
    };
    let n = 18;
    let (tau1, tau2) = (1e-10, 1e10);
    let dchi = Array1::from_shape_fn(n, |i| 1e-3 * (1.0 + i as f64 / n as f64));

    let mut log_uniform = LogUniformVrm::new(VrmProblem::new(small_mesh(), &config).unwrap());
    log_uniform.pair(dipole_survey());
    let f_log = log_uniform
        .fields(
            Array1::zeros(n).view(),
            dchi.view(),
            Array1::from_elem(n, tau1).view(),
            Array1::from_elem(n, tau2).view(),
        )
        .unwrap();

    let mut linear = LinearVrm::new(VrmProblem::new(small_mesh(), &config).unwrap());
    linear.pair(dipole_survey());
    let xi = dchi.mapv(|d| d / (tau2 / tau1).ln());
    let f_lin = linear.fields(xi.view()).unwrap();

    assert_eq!(f_log.len(), f_lin.len());
    for (a, b) in f_log.iter().zip(f_lin.iter()) {
        assert_rel(*a, *b, 1e-6);
    }
}

#[test]
fn config_driven_survey_end_to_end() {
    let json = r#"{
        "sources": [
            {
                "type": "circular_loop",
                "location": [0.0, 0.0, 0.5],
                "normal": [0.0, 0.0, 1.0],
                "radius": 2.0,
                "current": 1.0,
                "waveform": {"type": "step_off", "t0": 0.0},
                "receivers": [{
                    "locations": [[0.0, 0.0, 0.5], [1.0, 1.0, 0.5]],
                    "component": "z",
                    "times": [1e-5, 1e-4, 1e-3],
                    "field_type": "dhdt"
                }]
            },
            {
                "type": "mag_dipole",
                "location": [3.0, 0.0, 1.0],
                "moment": [1.0, 0.0, 0.0],
                "waveform": {"type": "step_off"},
                "receivers": [{
                    "locations": [[3.0, 0.0, 1.0]],
                    "component": "x",
                    "times": [1e-4],
                    "field_type": "dbdt"
                }]
            }
        ]
    }"#;
    let survey = Survey::from_config(&SurveyConfig::from_json_str(json).unwrap()).unwrap();
    assert_eq!(survey.n_data(), 7);

    let mesh = small_mesh();
    let mut problem = LinearVrm::new(VrmProblem::new(mesh, &VrmConfig::default()).unwrap());
    problem.pair(survey);
    let f = problem.fields(Array1::from_elem(18, 1e-4).view()).unwrap();
    assert_eq!(f.len(), 7);
    assert!(f.iter().all(|v| v.is_finite()));
    // dh/dt of a decaying response shrinks in magnitude with time.
    assert!(f[0].abs() > f[1].abs() && f[1].abs() > f[2].abs());
}
