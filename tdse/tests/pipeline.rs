use serde_json::json;
use tdse::{
    api::{
        self,
        TimeDep1DRequest,
        TimeDep1DResponse,
        ObservableRequest,
        TimeDep2DRequest,
        TimeDep2DResponse,
        TimeIndep1DRequest,
        TimeIndep2DRequest,
    },
    error::ErrorKind,
    limits::Limits,
    timedep::Method,
};

fn request_1d(extra: serde_json::Value) -> TimeDep1DRequest {
    let mut base = json!({
        "xmin": -6.0,
        "xmax": 6.0,
        "num_points": 200,
        "potential_expr": "x**2/2",
        "psi0_expr": "exp(-x**2/2)",
        "times": [0.0],
    });
    if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra.iter() { base.insert(k.clone(), v.clone()); }
    }
    serde_json::from_value(base).unwrap()
}

fn solve_1d(extra: serde_json::Value) -> TimeDep1DResponse {
    api::solve_timedep_1d(&request_1d(extra), &Limits::default()).unwrap()
}

fn density(psi: &[[f64; 2]]) -> Vec<f64> {
    psi.iter().map(|[re, im]| re * re + im * im).collect()
}

fn dx(x: &[f64]) -> f64 { x[1] - x[0] }

fn riemann_norm(psi: &[[f64; 2]], dx: f64) -> f64 {
    density(psi).iter().sum::<f64>() * dx
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

fn max_pair_diff(a: &[[f64; 2]], b: &[[f64; 2]]) -> f64 {
    a.iter().zip(b.iter())
        .map(|(p, q)| (p[0] - q[0]).hypot(p[1] - q[1]))
        .fold(0.0, f64::max)
}

#[test]
fn grid_and_initial_state() {
    let res = solve_1d(json!({}));
    assert_eq!(res.x.len(), 200);
    assert_eq!(res.x[0], -6.0);
    assert_eq!(res.x[199], 6.0);
    assert_eq!(res.times, vec![0.0]);
    assert_eq!(res.psi_t.len(), 1);
    assert_eq!(res.psi_t[0].len(), 200);
    assert!((riemann_norm(&res.psi_t[0], dx(&res.x)) - 1.0).abs() < 1e-6);
    assert!((res.norms[0] - 1.0).abs() < 1e-6);
}

#[test]
fn harmonic_ground_state_is_stationary() {
    let times = json!([0.0, 0.5, 1.0, 2.0]);
    // ground state of -∂² + x²
    let scaled = solve_1d(json!({
        "potential_expr": "x**2",
        "mass": 0.5,
        "times": times,
    }));
    // ground state of -∂²/2 + x²/2
    let unit = solve_1d(json!({ "times": times }));
    for res in [scaled, unit] {
        let rho0 = density(&res.psi_t[0]);
        for psi in res.psi_t.iter().skip(1) {
            assert!(max_abs_diff(&density(psi), &rho0) < 1e-3);
        }
    }
}

#[test]
fn norm_is_preserved() {
    for method in ["eigen", "split-step"] {
        let res = solve_1d(json!({
            "potential_expr": "x**2/2 + 0.3*x",
            "psi0_expr": "exp(-(x - 1)**2 + 2j*x)",
            "times": [0.05, -0.05, 0.2, 0.0],
            "method": method,
        }));
        for (psi, norm) in res.psi_t.iter().zip(res.norms.iter()) {
            assert!((riemann_norm(psi, dx(&res.x)) - 1.0).abs() < 1e-6);
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn duplicate_times_give_identical_snapshots() {
    let res = solve_1d(json!({
        "psi0_expr": "exp(-(x - 1)**2)",
        "times": [0.1, 0.0, 0.1, 0.1],
    }));
    assert_eq!(res.psi_t[0], res.psi_t[2]);
    assert_eq!(res.psi_t[0], res.psi_t[3]);
    assert_ne!(res.psi_t[0], res.psi_t[1]);
}

#[test]
fn unsorted_times_keep_request_order() {
    for (method, tol) in [("eigen", 1e-10), ("split-step", 1e-7)] {
        let extra = |times: serde_json::Value| json!({
            "psi0_expr": "exp(-(x - 1)**2)",
            "times": times,
            "method": method,
        });
        let res = solve_1d(extra(json!([0.02, 0.0, 0.01])));
        assert_eq!(res.times, vec![0.02, 0.0, 0.01]);
        for (k, t) in res.times.iter().enumerate() {
            let single = solve_1d(extra(json!([t])));
            assert!(max_pair_diff(&res.psi_t[k], &single.psi_t[0]) < tol);
        }
        // the displaced state moves, so snapshots are distinct
        assert!(max_pair_diff(&res.psi_t[0], &res.psi_t[2]) > 1e-4);
    }
}

#[test]
fn identical_requests_give_identical_responses() {
    let extra = json!({
        "potential_expr": "0.1*x**4 - x**2",
        "psi0_expr": "exp(-(x + 0.5)**2) * (1 + 0.5j*x)",
        "times": [0.3, 0.1],
        "method": "split-step",
    });
    let a = solve_1d(extra.clone());
    let b = solve_1d(extra);
    assert_eq!(a.psi_t, b.psi_t);
    assert_eq!(a.norms, b.norms);
}

#[test]
fn free_gaussian_spreads() {
    let res = solve_1d(json!({
        "xmin": -20.0,
        "xmax": 20.0,
        "num_points": 400,
        "potential_expr": "0",
        "psi0_expr": "exp(-x**2)",
        "times": [0.0, 0.25, 0.5, 1.0, 1.5],
    }));
    let variances: Vec<f64>
        = res.psi_t.iter()
        .map(|psi| {
            let rho = density(psi);
            let total: f64 = rho.iter().sum();
            let mean: f64
                = rho.iter().zip(res.x.iter()).map(|(r, x)| r * x).sum::<f64>() / total;
            rho.iter().zip(res.x.iter())
                .map(|(r, x)| r * (x - mean).powi(2))
                .sum::<f64>() / total
        })
        .collect();
    assert!((variances[0] - 0.25).abs() < 1e-6);
    assert!(variances.windows(2).all(|w| w[1] > w[0]));
    // σ²(t) = σ²(0) (1 + (t / 2σ²(0))²) with ħ = m = 1
    assert!((variances[4] - 0.25 * (1.0 + 9.0)).abs() < 1e-3);
}

#[test]
fn malicious_expression_is_rejected() {
    for field in ["potential_expr", "psi0_expr"] {
        let mut extra = serde_json::Map::new();
        extra.insert(field.to_string(), json!("__import__('os').system('ls')"));
        let req = request_1d(serde_json::Value::Object(extra));
        let err = api::solve_timedep_1d(&req, &Limits::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsafeExpression | ErrorKind::Parse));
        assert!(err.kind().is_client_error());
        assert!(err.to_string().starts_with(field));
    }
}

#[test]
fn invalid_grids_are_rejected() {
    for extra in [
        json!({ "num_points": 1 }),
        json!({ "num_points": 0 }),
        json!({ "xmin": 1.0, "xmax": 1.0 }),
        json!({ "xmin": 2.0, "xmax": -2.0 }),
    ] {
        let err
            = api::solve_timedep_1d(&request_1d(extra), &Limits::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGrid);
    }
}

#[test]
fn type_and_limit_errors() {
    // the grid contains x = 0
    let req = request_1d(json!({
        "xmin": -1.0, "xmax": 1.0, "num_points": 3, "potential_expr": "1/x",
    }));
    let err = api::solve_timedep_1d(&req, &Limits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    let req = request_1d(json!({ "num_points": 5000 }));
    let err = api::solve_timedep_1d(&req, &Limits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceLimit);

    let req = request_1d(json!({ "times": [1.0e6], "method": "split-step" }));
    let err = api::solve_timedep_1d(&req, &Limits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceLimit);

    let req = request_1d(json!({ "mass": -1.0 }));
    let err = api::solve_timedep_1d(&req, &Limits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn oversized_axes_fail_before_allocation() {
    for n in [1_u64 << 40, 1_u64 << 61, u64::MAX] {
        let req = request_1d(json!({ "num_points": n }));
        let err = api::solve_timedep_1d(&req, &Limits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceLimit);

        let req: TimeIndep1DRequest = serde_json::from_value(json!({
            "xmin": -1.0, "xmax": 1.0, "num_points": n, "potential_expr": "0",
        }))
        .unwrap();
        let err = api::solve_timeindep_1d(&req, &Limits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceLimit);

        let req: TimeDep2DRequest = serde_json::from_value(json!({
            "xmin": -1.0, "xmax": 1.0, "num_x": 8,
            "ymin": -1.0, "ymax": 1.0, "num_y": n,
            "potential_expr": "0", "psi0_expr": "1", "times": [0.0],
        }))
        .unwrap();
        let err = api::solve_timedep_2d(&req, &Limits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceLimit);

        let req: TimeIndep2DRequest = serde_json::from_value(json!({
            "xmin": -1.0, "xmax": 1.0, "num_x": n,
            "ymin": -1.0, "ymax": 1.0, "num_y": 8,
            "potential_expr": "0",
        }))
        .unwrap();
        let err = api::solve_timeindep_2d(&req, &Limits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceLimit);
    }

    // every axis fits but the total does not
    let req: TimeDep2DRequest = serde_json::from_value(json!({
        "xmin": -1.0, "xmax": 1.0, "num_x": 4096,
        "ymin": -1.0, "ymax": 1.0, "num_y": 4096,
        "potential_expr": "0", "psi0_expr": "1", "times": [0.0],
    }))
    .unwrap();
    let err = api::solve_timedep_2d(&req, &Limits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceLimit);

    let req: ObservableRequest = serde_json::from_value(json!({
        "expr": "x",
        "x": [0.0, 1.0, 2.0, 3.0],
        "psi": [1.0, 1.0, 1.0, 1.0],
    }))
    .unwrap();
    let limits = Limits { max_points_per_axis: 3, ..Limits::default() };
    let err = api::eval_observable(&req, &limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceLimit);
}

#[test]
fn step_work_scales_with_grid_size() {
    // 2000 steps: under the step count ceiling for any grid
    let extra = json!({ "times": [2.0], "method": "split-step" });
    assert!(api::solve_timedep_1d(&request_1d(extra.clone()), &Limits::default()).is_ok());
    let limits = Limits { max_step_work: 2000 * 200 - 1, ..Limits::default() };
    let err = api::solve_timedep_1d(&request_1d(extra), &limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceLimit);

    // 512 x 512 points to t = 2000 at the default time step
    let req: TimeDep2DRequest = serde_json::from_value(json!({
        "xmin": -1.0, "xmax": 1.0, "num_x": 512,
        "ymin": -1.0, "ymax": 1.0, "num_y": 512,
        "potential_expr": "0", "psi0_expr": "1",
        "times": [2000.0], "method": "split-step",
    }))
    .unwrap();
    let err = api::solve_timedep_2d(&req, &Limits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceLimit);
}

#[test]
fn auto_switches_to_split_step() {
    let limits = Limits { eigen_max_points: 100, ..Limits::default() };
    let req = request_1d(json!({ "times": [0.1] }));
    let res = api::solve_timedep_1d(&req, &limits).unwrap();
    assert_eq!(res.method, Method::SplitStep);
    let reference = solve_1d(json!({ "times": [0.1] }));
    assert_eq!(reference.method, Method::Eigen);
    assert!(max_pair_diff(&res.psi_t[0], &reference.psi_t[0]) < 1e-5);
}

#[test]
fn dirichlet_walls_hold_the_state() {
    // the walls sit one spacing outside the grid, at x = 0 and x = 1
    let res = solve_1d(json!({
        "xmin": 0.01,
        "xmax": 0.99,
        "num_points": 99,
        "potential_expr": "0",
        "psi0_expr": "sin(pi*x)",
        "boundary": "dirichlet",
        "times": [0.0, 0.05],
    }));
    let rho0 = density(&res.psi_t[0]);
    assert!(max_abs_diff(&density(&res.psi_t[1]), &rho0) < 1e-6);
    assert!((res.norms[1] - 1.0).abs() < 1e-6);
}

#[test]
fn shapes_2d() {
    let req: TimeDep2DRequest = serde_json::from_value(json!({
        "xmin": -5.0, "xmax": 5.0, "num_x": 24,
        "ymin": -4.0, "ymax": 4.0, "num_y": 16,
        "potential_expr": "(X**2 + Y**2)/2",
        "psi0_expr": "exp(-((X - 1)**2 + Y**2)/2)",
        "times": [0.0, 0.3],
    }))
    .unwrap();
    let res = api::solve_timedep_2d(&req, &Limits::default()).unwrap();
    for grid in [&res.X, &res.Y, &res.V] {
        assert_eq!(grid.len(), 16);
        assert!(grid.iter().all(|row| row.len() == 24));
    }
    assert_eq!(res.psi_t.len(), 2);
    for psi in res.psi_t.iter() {
        assert_eq!(psi.len(), 16);
        assert!(psi.iter().all(|row| row.len() == 24));
    }
    // rows vary in y, columns in x
    assert_eq!(res.X[0][0], -5.0);
    assert_eq!(res.X[15][23], 5.0);
    assert_eq!(res.X[3][0], res.X[0][0]);
    assert_eq!(res.Y[0][0], -4.0);
    assert_eq!(res.Y[0][23], -4.0);
    assert_eq!(res.Y[15][0], 4.0);
    let cell = (res.X[0][1] - res.X[0][0]) * (res.Y[1][0] - res.Y[0][0]);
    let norm: f64
        = res.psi_t[1].iter().flatten()
        .map(|[re, im]| re * re + im * im)
        .sum::<f64>() * cell;
    assert!((norm - 1.0).abs() < 1e-6);
}

// ⟨x⟩ and ⟨y⟩ of each snapshot
fn centers_2d(res: &TimeDep2DResponse) -> Vec<(f64, f64)> {
    res.psi_t.iter()
        .map(|psi| {
            let mut total = 0.0;
            let mut x = 0.0;
            let mut y = 0.0;
            for (j, row) in psi.iter().enumerate() {
                for (i, [re, im]) in row.iter().enumerate() {
                    let rho = re * re + im * im;
                    total += rho;
                    x += rho * res.X[j][i];
                    y += rho * res.Y[j][i];
                }
            }
            (x / total, y / total)
        })
        .collect()
}

#[test]
fn packets_move_along_their_own_axis_2d() {
    // unequal point counts and spacings so any x/y mixup changes the result
    let request = |psi0: &str, method: &str| -> TimeDep2DRequest {
        serde_json::from_value(json!({
            "xmin": -6.0, "xmax": 6.0, "num_x": 40,
            "ymin": -5.0, "ymax": 5.0, "num_y": 25,
            "potential_expr": "0",
            "psi0_expr": psi0,
            "times": [0.0, 0.5],
            "method": method,
        }))
        .unwrap()
    };
    // group velocity ħk/m = 2, so the packet center moves by 1 in t = 0.5
    for (psi0, moves_x) in [
        ("exp(-(X**2 + Y**2)) * exp(2j*X)", true),
        ("exp(-(X**2 + Y**2)) * exp(2j*Y)", false),
    ] {
        let mut snapshots: Vec<Vec<Vec<[f64; 2]>>> = Vec::new();
        for (method, expected) in [
            ("eigen", Method::Eigen),
            ("split-step", Method::SplitStep),
        ] {
            let res
                = api::solve_timedep_2d(&request(psi0, method), &Limits::default())
                .unwrap();
            assert_eq!(res.method, expected);
            assert_eq!(res.psi_t[1].len(), 25);
            assert!(res.psi_t[1].iter().all(|row| row.len() == 40));
            let centers = centers_2d(&res);
            assert!(centers[0].0.abs() < 1e-8);
            assert!(centers[0].1.abs() < 1e-8);
            let (x, y) = centers[1];
            if moves_x {
                assert!((x - 1.0).abs() < 1e-3);
                assert!(y.abs() < 1e-8);
            } else {
                assert!(x.abs() < 1e-8);
                assert!((y - 1.0).abs() < 1e-3);
            }
            assert!((res.norms[1] - 1.0).abs() < 1e-6);
            snapshots.push(res.psi_t[1].clone());
        }
        // free propagation is exact in both schemes
        let diff
            = snapshots[0].iter().flatten().zip(snapshots[1].iter().flatten())
            .map(|(p, q)| (p[0] - q[0]).hypot(p[1] - q[1]))
            .fold(0.0, f64::max);
        assert!(diff < 1e-6);
    }
}

#[test]
fn very_large_times_stay_finite() {
    let res = solve_1d(json!({
        "psi0_expr": "exp(-(x - 1)**2 + 1j*x)",
        "times": [1.0e9, -1.0e9, 0.0],
        "method": "eigen",
    }));
    assert_eq!(res.method, Method::Eigen);
    for (psi, norm) in res.psi_t.iter().zip(res.norms.iter()) {
        assert!(psi.iter().all(|[re, im]| re.is_finite() && im.is_finite()));
        assert!((norm - 1.0).abs() < 1e-6);
    }
}

#[test]
fn eigenstates_1d() {
    let req: TimeIndep1DRequest = serde_json::from_value(json!({
        "xmin": -8.0, "xmax": 8.0, "num_points": 256,
        "potential_expr": "x**2/2",
        "num_eigen": 3,
    }))
    .unwrap();
    let res = api::solve_timeindep_1d(&req, &Limits::default()).unwrap();
    assert_eq!(res.energies.len(), 3);
    assert_eq!(res.wavefuncs.len(), 3);
    let dx = dx(&res.x);
    for (n, (e, wf)) in res.energies.iter().zip(res.wavefuncs.iter()).enumerate() {
        assert!((e - (n as f64 + 0.5)).abs() < 1e-6);
        assert_eq!(wf.len(), 256);
        let norm = wf.iter().map(|w| w * w).sum::<f64>() * dx;
        assert!((norm - 1.0).abs() < 1e-10);
    }
    let req: TimeIndep1DRequest = serde_json::from_value(json!({
        "xmin": -8.0, "xmax": 8.0, "num_points": 256,
        "potential_expr": "x**2/2",
    }))
    .unwrap();
    assert_eq!(req.num_eigen, 5);
}

#[test]
fn eigenstates_2d() {
    let req: TimeIndep2DRequest = serde_json::from_value(json!({
        "xmin": -6.0, "xmax": 6.0, "num_x": 24,
        "ymin": -6.0, "ymax": 6.0, "num_y": 24,
        "potential_expr": "(X**2 + Y**2)/2",
        "num_eigen": 3,
    }))
    .unwrap();
    let res = api::solve_timeindep_2d(&req, &Limits::default()).unwrap();
    assert!((res.energies[0] - 1.0).abs() < 1e-3);
    assert!((res.energies[1] - 2.0).abs() < 1e-3);
    assert!((res.energies[2] - 2.0).abs() < 1e-3);
    assert_eq!(res.wavefuncs.len(), 3);
    assert!(res.wavefuncs.iter().all(|wf| wf.len() == 24 && wf[0].len() == 24));

    let req: TimeIndep2DRequest = serde_json::from_value(json!({
        "xmin": -6.0, "xmax": 6.0, "num_x": 4,
        "ymin": -6.0, "ymax": 6.0, "num_y": 4,
        "potential_expr": "0",
        "num_eigen": 17,
    }))
    .unwrap();
    let err = api::solve_timeindep_2d(&req, &Limits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}
