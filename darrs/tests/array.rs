#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use darrs::array::{Array, ArrayBuilder, ArrayChunk, ArrayError, ArraySubset, BoxError, FromSourceOptions};
use darrs::data_type::{NumericType, Scalar};
use darrs::filesystem::{AccessMode, StorageError};
use darrs::metadata::Attributes;

fn snapshot(path: &Path) -> Result<BTreeMap<PathBuf, Vec<u8>>, Box<dyn std::error::Error>> {
    let mut files = BTreeMap::new();
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.insert(entry.path().to_path_buf(), std::fs::read(entry.path())?);
        }
    }
    Ok(files)
}

#[test]
fn array_append_rows() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("array.darr");
    let mut array = ArrayBuilder::new(vec![5, 2], NumericType::Int64)
        .fill_value(0i64)
        .build(&path)?;
    array.append(ArrayChunk::from_elements(vec![1i64, 2, 3, 4, 5, 6], vec![3, 2])?)?;
    assert_eq!(array.shape(), &[8, 2]);
    assert_eq!(
        array.retrieve_elements::<i64>()?,
        vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6]
    );
    assert_eq!(std::fs::metadata(path.join("arrayvalues.bin"))?.len(), 128);

    let reopened = Array::open(&path, AccessMode::ReadOnly)?;
    assert_eq!(reopened.shape(), &[8, 2]);
    assert_eq!(reopened.retrieve_element::<i64>(&[7, 0])?, 5);
    Ok(())
}

#[test]
fn array_truncate() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let mut array = ArrayBuilder::new(vec![5], NumericType::Float32)
        .fill_fn(|indices: &[u64]| indices[0] as f32)
        .build(tmp.path().join("array.darr"))?;
    array.truncate(2)?;
    assert_eq!(array.retrieve_elements::<f32>()?, vec![0.0, 1.0]);
    assert_eq!(std::fs::metadata(array.payload_path())?.len(), 8);

    assert!(matches!(
        array.truncate(2),
        Err(ArrayError::InvalidTruncation { len: 2, current: 2 })
    ));
    assert!(matches!(
        array.truncate(3),
        Err(ArrayError::InvalidTruncation { len: 3, current: 2 })
    ));
    array.truncate(0)?;
    assert!(array.is_empty());
    assert_eq!(std::fs::metadata(array.payload_path())?.len(), 0);
    Ok(())
}

#[test]
fn array_append_then_truncate_restores_files() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("array.darr");
    let mut array = ArrayBuilder::new(vec![3, 4], NumericType::UInt16)
        .fill_value(9u16)
        .build(&path)?;
    let before = snapshot(&path)?;
    array.append(ArrayChunk::from_elements(vec![1u16; 8], vec![2, 4])?)?;
    assert_ne!(snapshot(&path)?, before);
    array.truncate(3)?;
    assert_eq!(snapshot(&path)?, before);
    Ok(())
}

#[test]
fn array_append_incomplete() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("array.darr");
    let mut array = ArrayBuilder::new(vec![5, 2], NumericType::Int64).build(&path)?;
    let source: Vec<Result<ArrayChunk, BoxError>> = vec![
        Ok(ArrayChunk::from_elements(vec![1i64, 2, 3, 4], vec![2, 2])?),
        Err("the source failed".into()),
        Ok(ArrayChunk::from_elements(vec![5i64, 6], vec![1, 2])?),
    ];
    let Err(ArrayError::AppendIncomplete(err)) = array.iter_append(source) else {
        panic!("expected an incomplete append");
    };
    assert_eq!(err.shape_before(), &[5, 2]);
    assert_eq!(err.shape_after(), &[7, 2]);
    assert_eq!(err.error().to_string(), "the source failed");
    assert_eq!(array.shape(), &[7, 2]);
    assert_eq!(std::fs::metadata(array.payload_path())?.len(), 7 * 2 * 8);

    let reopened = Array::open(&path, AccessMode::ReadOnly)?;
    assert_eq!(reopened.shape(), &[7, 2]);
    assert_eq!(reopened.retrieve_rows_elements::<i64>(5..7)?, vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn array_append_source_fails_immediately() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let mut array = ArrayBuilder::new(vec![2], NumericType::UInt8).build(tmp.path().join("a.darr"))?;
    let source: Vec<Result<ArrayChunk, BoxError>> = vec![Err("no data".into())];
    let Err(ArrayError::AppendIncomplete(err)) = array.iter_append(source) else {
        panic!("expected an incomplete append");
    };
    assert_eq!(err.shape_before(), err.shape_after());
    assert_eq!(array.shape(), &[2]);
    Ok(())
}

#[test]
fn array_append_mismatch_after_rows() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let mut array = ArrayBuilder::new(vec![1, 2], NumericType::Int32).build(tmp.path().join("a.darr"))?;
    let source = vec![
        ArrayChunk::from_elements(vec![1i32, 2], vec![1, 2]),
        ArrayChunk::from_elements(vec![1i32, 2, 3], vec![1, 3]),
    ];
    let Err(ArrayError::AppendIncomplete(err)) = array.iter_append(source) else {
        panic!("expected an incomplete append");
    };
    assert_eq!(err.shape_after(), &[2, 2]);
    assert_eq!(array.retrieve_elements::<i32>()?, vec![0, 0, 1, 2]);
    Ok(())
}

#[test]
fn array_numeric_types() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    for numeric_type in NumericType::ALL {
        let path = tmp.path().join(numeric_type.name());
        let array = ArrayBuilder::new(vec![3], numeric_type)
            .fill_value(Scalar::UInt(1))
            .build(&path)?;
        let reopened = Array::open(&path, AccessMode::ReadOnly)?;
        assert_eq!(reopened.numeric_type(), numeric_type);
        assert_eq!(reopened.nbytes(), 3 * numeric_type.size() as u64);
        assert_eq!(
            reopened.retrieve_chunk(&array.subset_all())?.bytes(),
            Scalar::UInt(1).to_ne_bytes(numeric_type).repeat(3)
        );
    }
    Ok(())
}

#[test]
fn array_read_only_is_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("array.darr");
    let mut metadata = Attributes::new();
    metadata.insert("fs".to_string(), 20000.into());
    ArrayBuilder::new(vec![4, 3], NumericType::Float64)
        .fill_value(0.5f64)
        .metadata(metadata)
        .build(&path)?;
    let before = snapshot(&path)?;

    let mut array = Array::open(&path, AccessMode::ReadOnly)?;
    let _ = array.retrieve_elements::<f64>()?;
    let _ = array.iter_chunks(array.iter_frames(NonZeroU64::new(3).unwrap())).count();
    assert!(matches!(
        array.append(vec![1.0f64, 2.0, 3.0]),
        Err(ArrayError::StorageError(StorageError::ReadOnly(_)))
    ));
    assert!(matches!(array.truncate(1), Err(ArrayError::StorageError(StorageError::ReadOnly(_)))));
    assert!(array.store_element(&[0, 0], 1.0f64).is_err());
    assert!(array.metadata().insert("channels", 2).is_err());
    assert!(array.metadata().clear().is_err());
    assert_eq!(snapshot(&path)?, before);

    let array = Array::open(&path, AccessMode::ReadOnly)?;
    assert!(array.delete().is_err());
    assert_eq!(snapshot(&path)?, before);
    Ok(())
}

#[test]
fn array_store_subset() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let array = ArrayBuilder::new(vec![3, 3], NumericType::UInt8).build(tmp.path().join("a.darr"))?;
    array.store_array_subset_elements(&ArraySubset::new_with_ranges(&[1..3, 1..3]), &[1u8, 2, 3, 4])?;
    array.store_element(&[0, 2], 5u8)?;
    assert_eq!(array.retrieve_elements::<u8>()?, vec![0, 0, 5, 0, 1, 2, 0, 3, 4]);
    assert!(matches!(
        array.store_element(&[0, 0], 1u16),
        Err(ArrayError::IncompatibleElementType { .. })
    ));
    assert!(matches!(
        array.retrieve_chunk(&ArraySubset::new_with_ranges(&[2..4, 0..1])),
        Err(ArrayError::InvalidArraySubset(..))
    ));
    Ok(())
}

#[test]
fn array_newer_version_warns() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("array.darr");
    ArrayBuilder::new(vec![2], NumericType::Int8).build(&path)?;
    let description_path = path.join("arraydescription.json");
    let mut description: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&description_path)?)?;
    description["darrversion"] = "99.0.0".into();
    std::fs::write(&description_path, serde_json::to_vec(&description)?)?;

    testing_logger::setup();
    let array = Array::open(&path, AccessMode::ReadOnly)?;
    assert_eq!(array.format_version(), "99.0.0");
    testing_logger::validate(|captured_logs| {
        assert_eq!(captured_logs.len(), 1);
        assert_eq!(captured_logs[0].level, log::Level::Warn);
        assert!(captured_logs[0].body.contains("99.0.0"));
    });
    Ok(())
}

#[test]
fn array_metadata_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("array.darr");
    let array = ArrayBuilder::new(vec![2], NumericType::Int8).build(&path)?;
    assert!(!path.join("metadata.json").exists());
    array.metadata().insert("samplingrate", 1000)?;
    assert!(path.join("metadata.json").exists());
    assert_eq!(array.metadata().remove("samplingrate")?, Some(1000.into()));
    assert!(!path.join("metadata.json").exists());
    Ok(())
}

#[test]
fn array_copy_and_delete() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("array.darr");
    let mut metadata = Attributes::new();
    metadata.insert("unit".to_string(), "mV".into());
    let array = ArrayBuilder::new(vec![4, 2], NumericType::Int16)
        .fill_fn(|indices: &[u64]| (indices[0] * 10 + indices[1]) as i16)
        .metadata(metadata)
        .build(&path)?;

    let mut options = FromSourceOptions::default();
    options.numeric_type(NumericType::Float64).chunk_len(NonZeroU64::new(3).unwrap());
    let copy = array.copy(tmp.path().join("copy.darr"), &options)?;
    assert_eq!(copy.shape(), &[4, 2]);
    assert_eq!(copy.numeric_type(), NumericType::Float64);
    assert_eq!(copy.retrieve_rows_elements::<f64>(3..4)?, vec![30.0, 31.0]);
    assert_eq!(copy.metadata().get("unit")?, Some("mV".into()));
    assert!(array.copy(&path, &options).is_err());

    copy.delete()?;
    assert!(!tmp.path().join("copy.darr").exists());

    std::fs::write(path.join("notes.txt"), b"keep")?;
    assert!(matches!(
        array.delete(),
        Err(ArrayError::StorageError(StorageError::DirectoryNotEmpty(_)))
    ));
    assert!(path.join("notes.txt").exists());
    assert!(!path.join("arrayvalues.bin").exists());
    Ok(())
}

#[cfg(feature = "ndarray")]
#[test]
fn array_ndarray() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let mut array = Array::from_chunk(
        tmp.path().join("a.darr"),
        ndarray::array![[1.0f32, 2.0], [3.0, 4.0]],
        &FromSourceOptions::default(),
    )?;
    array.append(ndarray::array![[5.0f32, 6.0]])?;
    assert_eq!(
        array.retrieve_ndarray::<f32>()?,
        ndarray::array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn()
    );
    Ok(())
}

#[test]
fn array_half_and_complex() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let halves = vec![half::f16::from_f32(0.5), half::f16::from_f32(-2.0)];
    let array = Array::from_chunk(tmp.path().join("f16.darr"), halves.clone(), &FromSourceOptions::default())?;
    assert_eq!(array.numeric_type(), NumericType::Float16);
    assert_eq!(array.nbytes(), 4);
    assert_eq!(array.retrieve_elements::<half::f16>()?, halves);

    let complex = vec![num::complex::Complex32::new(1.0, -1.0), num::complex::Complex32::new(0.0, 2.5)];
    let mut options = FromSourceOptions::default();
    options.numeric_type(NumericType::Complex128);
    let array = Array::from_chunk(tmp.path().join("c.darr"), complex, &options)?;
    assert_eq!(array.nbytes(), 32);
    assert_eq!(
        array.retrieve_element::<num::complex::Complex64>(&[1])?,
        num::complex::Complex64::new(0.0, 2.5)
    );
    Ok(())
}
