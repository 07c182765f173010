//! Writes through one view are visible through every alias of its storage.

use ndstride::{s, Array, DType, Scalar};

fn grid() -> Array {
    Array::arange(0i32, 12, 1).unwrap().reshape(&[3, 4]).unwrap()
}

#[test]
fn test_write_through_slice_is_visible() {
    let a = grid();
    let col = a.slice(&s![.., 2]).unwrap();
    col.fill(Scalar::I32(0)).unwrap();
    assert_eq!(
        a.to_vec::<i32>().unwrap(),
        vec![0, 1, 0, 3, 4, 5, 0, 7, 8, 9, 0, 11]
    );
}

#[test]
fn test_write_through_reversed_view() {
    let a = grid();
    let flipped = a.flip(1).unwrap();
    flipped.set(&[0, 0], Scalar::I32(100)).unwrap();
    assert_eq!(a.get(&[0, 3]).unwrap(), Scalar::I32(100));
}

#[test]
fn test_in_place_add_of_own_transpose() {
    let a = Array::arange(0i64, 9, 1).unwrap().reshape(&[3, 3]).unwrap();
    let t = a.transpose().unwrap();
    a.add_assign(&t).unwrap();
    assert_eq!(
        a.to_vec::<i64>().unwrap(),
        vec![0, 4, 8, 4, 8, 12, 8, 12, 16]
    );
}

#[test]
fn test_in_place_shifted_overlap() {
    // a[1:] += a[:-1] must read the original a[:-1]
    let a = Array::arange(1i32, 6, 1).unwrap();
    let tail = a.slice(&s![1..5]).unwrap();
    let head = a.slice(&s![0..4]).unwrap();
    tail.add_assign(&head).unwrap();
    assert_eq!(a.to_vec::<i32>().unwrap(), vec![1, 3, 5, 7, 9]);
}

#[test]
fn test_assign_into_broadcast_source_region() {
    let a = Array::zeros(DType::F64, &[2, 3]).unwrap();
    let row = a.slice(&s![0]).unwrap();
    row.assign(&Array::from_vec(vec![1.0f64, 2.0, 3.0], &[3]).unwrap())
        .unwrap();
    let second = a.slice(&s![1]).unwrap();
    second.assign(&row).unwrap();
    assert_eq!(
        a.to_vec::<f64>().unwrap(),
        vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]
    );
}

#[test]
fn test_results_are_fresh() {
    let a = grid();
    let b = a.add(&a).unwrap();
    assert!(!b.aliases(&a));
    b.fill(Scalar::I32(0)).unwrap();
    assert_eq!(a.get(&[2, 3]).unwrap(), Scalar::I32(11));
}

#[test]
fn test_storage_handles_are_shared() {
    let a = grid();
    let before = a.view().storage().handle_count();
    let v = a.transpose().unwrap();
    assert_eq!(a.view().storage().handle_count(), before + 1);
    drop(v);
    assert_eq!(a.view().storage().handle_count(), before);
}
