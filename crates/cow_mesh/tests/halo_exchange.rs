// crates/cow_mesh/tests/halo_exchange.rs

//! 多 rank 光环交换测试
//! 每个 rank 在 `std::thread::scope` 中独占一个线程和一个 `LocalCartComm`

use std::thread;

use cow_foundation::{Array, CowError, Region, RegionCursor};
use cow_mesh::{
    CartesianTopology, Direction, DistributedUniformMesh, GuardZoneExtension, LocalCartComm,
};

/// 周期全局场
fn field(global: &[usize], coords: &[isize]) -> f64 {
    coords
        .iter()
        .zip(global)
        .fold(0.0, |acc, (&c, &n)| acc * 1000.0 + c.rem_euclid(n as isize) as f64)
}

/// 在每个 rank 上填充内部、同步，并检查本地数组每个单元（含保护带和角区）
fn run_and_verify(global: &[usize], dims: &[usize], guard: GuardZoneExtension) -> Vec<usize> {
    let comms = LocalCartComm::create(dims).unwrap();
    thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let mesh = DistributedUniformMesh::new(global, comm, guard).unwrap();
                    let start = mesh.global_start();
                    let mut a = mesh.create_array();

                    let interior = mesh.interior_region().resolve_within(&a.shape()).unwrap();
                    for index in RegionCursor::new(&interior) {
                        let coords: Vec<isize> = (0..global.len())
                            .map(|n| (start[n] + index[n]) as isize - guard.lower[n] as isize)
                            .collect();
                        a[index] = field(global, &coords);
                    }

                    mesh.synchronize(&mut a).unwrap();

                    for index in RegionCursor::new(&Region::whole(&a.shape())) {
                        let coords: Vec<isize> = (0..global.len())
                            .map(|n| (start[n] + index[n]) as isize - guard.lower[n] as isize)
                            .collect();
                        assert_eq!(
                            a[index],
                            field(global, &coords),
                            "rank {} cell {:?}",
                            mesh.topology().rank(),
                            index
                        );
                    }
                    mesh.interior_shape()[0]
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn test_1d_four_ranks_guard_2_3() {
    let guard = GuardZoneExtension::from_widths(&[2], &[3]).unwrap();
    let interiors = run_and_verify(&[128], &[4], guard);
    assert_eq!(interiors.iter().sum::<usize>(), 128);
}

#[test]
fn test_1d_uneven_partition() {
    let guard = GuardZoneExtension::from_widths(&[1], &[1]).unwrap();
    let interiors = run_and_verify(&[11], &[3], guard);
    assert_eq!(interiors, vec![4, 4, 3]);
}

#[test]
fn test_2d_corners_are_consistent() {
    let guard = GuardZoneExtension::from_widths(&[1, 2], &[2, 1]).unwrap();
    run_and_verify(&[10, 7], &[2, 2], guard);
}

#[test]
fn test_3d_with_one_sided_guards() {
    let guard = GuardZoneExtension::from_widths(&[1, 0, 1], &[0, 1, 1]).unwrap();
    run_and_verify(&[6, 5, 4], &[3, 1, 2], guard);
}

#[test]
fn test_explicit_shift_exchange_moves_one_strip() {
    let comms = LocalCartComm::create(&[2]).unwrap();
    let guard = GuardZoneExtension::from_widths(&[1], &[1]).unwrap();
    let results: Vec<Array> = thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let mesh = DistributedUniformMesh::new(&[4], comm, guard).unwrap();
                    let mut a = mesh.create_array();
                    a.fill(mesh.topology().rank() as f64 + 1.0);
                    mesh.shift_exchange(
                        &mut a,
                        0,
                        Direction::TowardHigher,
                        &guard.send_region(0, Direction::TowardHigher),
                        &guard.recv_region(0, Direction::TowardHigher),
                    )
                    .unwrap();
                    a
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    // 只有低侧保护带被对方覆盖
    assert_eq!(results[0].as_slice(), &[2.0, 1.0, 1.0, 1.0]);
    assert_eq!(results[1].as_slice(), &[1.0, 2.0, 2.0, 2.0]);
}

#[test]
fn test_synchronize_rejects_wrong_shape() {
    let comms = LocalCartComm::create(&[1]).unwrap();
    let guard = GuardZoneExtension::from_widths(&[1], &[1]).unwrap();
    let mesh = DistributedUniformMesh::new(&[8], comms[0].clone(), guard).unwrap();
    let mut wrong = Array::from_extents(&[8]).unwrap();
    assert!(matches!(
        mesh.synchronize(&mut wrong),
        Err(CowError::ShapeMismatch { .. })
    ));
}

#[cfg(debug_assertions)]
#[test]
fn test_overlapping_regions_rejected_in_debug() {
    let comms = LocalCartComm::create(&[1]).unwrap();
    let mesh =
        DistributedUniformMesh::new(&[8], comms[0].clone(), GuardZoneExtension::none()).unwrap();
    let mut a = mesh.create_array();
    let err = mesh
        .shift_exchange(&mut a, 0, Direction::TowardLower, &Region::new(), &Region::new())
        .unwrap_err();
    assert!(matches!(err, CowError::RegionOverlap { axis: 0 }));
}
