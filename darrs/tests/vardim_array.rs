#![allow(missing_docs)]

use darrs::array::{ArrayChunk, ArrayCreateError, ArrayError, BoxError, FromSourceOptions};
use darrs::data_type::NumericType;
use darrs::filesystem::AccessMode;
use darrs::vardim_array::{VarDimArray, VarDimArrayBuilder};

fn elements() -> Result<Vec<ArrayChunk>, ArrayError> {
    Ok(vec![
        ArrayChunk::from_elements((0u32..6).collect(), vec![2, 3])?,
        ArrayChunk::from_elements(vec![6u32, 7], vec![2])?,
        ArrayChunk::from_elements((8u32..16).collect(), vec![2, 2, 2])?,
    ])
}

#[test]
fn vardim_array_mixed_shapes() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("vardim.darr");
    let mut options = FromSourceOptions::default();
    options.index_type(NumericType::Int32);
    let vardim_array = VarDimArray::from_elements(
        &path,
        elements()?.into_iter().map(Ok::<_, ArrayError>),
        &options,
    )?;
    assert_eq!(vardim_array.len(), 3);
    assert_eq!(vardim_array.size(), 16);
    assert_eq!(vardim_array.numeric_type(), NumericType::UInt32);
    assert_eq!(vardim_array.index_type(), NumericType::Int32);
    assert_eq!(vardim_array.element_shape(0)?, vec![2, 3]);
    assert_eq!(vardim_array.element_shape(2)?, vec![2, 2, 2]);
    assert_eq!(vardim_array.element_range(1)?, 6..8);
    assert_eq!(vardim_array.get_elements::<u32>(1)?, vec![6, 7]);
    assert_eq!(vardim_array.get_chunk(2)?, elements()?.remove(2));
    assert!(matches!(
        vardim_array.get_chunk(3),
        Err(ArrayError::OutOfBounds { index: 3, len: 3 })
    ));

    let rows = vardim_array.indices_and_shapes();
    assert_eq!(rows.get_elements::<i32>(0)?, vec![0, 6, 2, 3]);
    assert_eq!(rows.get_elements::<i32>(2)?, vec![8, 16, 2, 2, 2]);

    let description: serde_json::Value =
        serde_json::from_slice(&std::fs::read(path.join("arraydescription.json"))?)?;
    assert_eq!(description["darrobject"], "VarDimArray");
    assert_eq!(description["len"], 3);
    assert_eq!(description["size"], 16);

    let reopened = VarDimArray::open(&path, AccessMode::ReadOnly)?;
    let chunks = reopened
        .iter_chunks(0..reopened.len())
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(chunks, elements()?);
    Ok(())
}

#[test]
fn vardim_array_append_and_truncate() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("vardim.darr");
    let mut vardim_array = VarDimArrayBuilder::new(NumericType::Float64).build(&path)?;
    assert!(vardim_array.is_empty());
    for element in elements()? {
        vardim_array.append(element)?;
    }
    assert_eq!(vardim_array.get_elements::<f64>(1)?, vec![6.0, 7.0]);

    vardim_array.truncate(1)?;
    assert_eq!(vardim_array.len(), 1);
    assert_eq!(vardim_array.size(), 6);
    assert_eq!(vardim_array.values().len(), 6);
    assert_eq!(vardim_array.indices_and_shapes().len(), 1);
    assert!(matches!(
        vardim_array.truncate(1),
        Err(ArrayError::InvalidTruncation { len: 1, current: 1 })
    ));
    vardim_array.truncate(0)?;

    let reopened = VarDimArray::open(&path, AccessMode::ReadOnly)?;
    assert_eq!(reopened.len(), 0);
    assert_eq!(reopened.size(), 0);
    Ok(())
}

#[test]
fn vardim_array_index_overflow() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let mut vardim_array = VarDimArrayBuilder::new(NumericType::UInt8)
        .index_type(NumericType::UInt8)
        .build(tmp.path().join("vardim.darr"))?;
    assert!(matches!(
        vardim_array.append(ArrayChunk::from_elements(vec![0u8; 300], vec![300])?),
        Err(ArrayError::IndexOverflow { value: 300, .. })
    ));
    assert!(vardim_array.is_empty());
    assert!(vardim_array.values().is_empty());

    assert!(matches!(
        VarDimArrayBuilder::new(NumericType::UInt8)
            .index_type(NumericType::Float32)
            .build(tmp.path().join("other.darr")),
        Err(ArrayCreateError::UnsupportedIndexType(NumericType::Float32))
    ));
    Ok(())
}

#[test]
fn vardim_array_offsets_overflow() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let mut vardim_array = VarDimArrayBuilder::new(NumericType::UInt8)
        .index_type(NumericType::UInt8)
        .build(tmp.path().join("vardim.darr"))?;
    // Each one-dimensional element adds three offsets to indicesandshapes
    vardim_array.iter_append((0u8..85).map(|value| Ok::<ArrayChunk, ArrayError>(vec![value].into())))?;
    assert_eq!(vardim_array.indices_and_shapes().size(), 255);
    assert!(matches!(
        vardim_array.append(vec![85u8]),
        Err(ArrayError::IndexOverflow { value: 258, .. })
    ));
    assert_eq!(vardim_array.len(), 85);
    assert_eq!(std::fs::metadata(vardim_array.values().payload_path())?.len(), 85);
    assert_eq!(vardim_array.get_elements::<u8>(84)?, vec![84]);
    Ok(())
}

#[test]
fn vardim_array_iter_chunks_step() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let vardim_array = VarDimArray::from_elements(
        tmp.path().join("vardim.darr"),
        elements()?.into_iter().map(Ok::<_, ArrayError>),
        &FromSourceOptions::default(),
    )?;
    let chunks = vardim_array
        .iter_chunks((0..vardim_array.len()).step_by(2))
        .collect::<Result<Vec<_>, _>>()?;
    let mut expected = elements()?;
    expected.remove(1);
    assert_eq!(chunks, expected);
    Ok(())
}

#[test]
fn vardim_array_append_incomplete() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("vardim.darr");
    let mut vardim_array = VarDimArrayBuilder::new(NumericType::Int64).build(&path)?;
    let source: Vec<Result<ArrayChunk, BoxError>> = vec![
        Ok(ArrayChunk::from_elements(vec![1i64, 2, 3, 4], vec![2, 2])?),
        Err("the source failed".into()),
    ];
    let Err(ArrayError::AppendIncomplete(err)) = vardim_array.iter_append(source) else {
        panic!("expected an incomplete append");
    };
    assert_eq!(err.shape_before(), &[0]);
    assert_eq!(err.shape_after(), &[1]);

    let reopened = VarDimArray::open(&path, AccessMode::ReadOnly)?;
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.element_shape(0)?, vec![2, 2]);
    Ok(())
}

#[test]
fn vardim_array_copy_and_delete() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let path = tmp.path().join("vardim.darr");
    let vardim_array = VarDimArray::from_elements(
        &path,
        elements()?.into_iter().map(Ok::<_, ArrayError>),
        &FromSourceOptions::default(),
    )?;
    let mut options = FromSourceOptions::default();
    options.numeric_type(NumericType::Int64);
    let copy = vardim_array.copy(tmp.path().join("copy.darr"), &options)?;
    assert_eq!(copy.len(), 3);
    assert_eq!(copy.numeric_type(), NumericType::Int64);
    assert_eq!(copy.element_shape(2)?, vec![2, 2, 2]);
    assert_eq!(copy.get_elements::<i64>(1)?, vec![6, 7]);

    vardim_array.delete()?;
    assert!(!path.exists());
    copy.delete()?;
    Ok(())
}

#[cfg(feature = "ndarray")]
#[test]
fn vardim_array_ndarray() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::TempDir::new()?;
    let mut vardim_array =
        VarDimArrayBuilder::new(NumericType::Float32).build(tmp.path().join("vardim.darr"))?;
    vardim_array.append(ndarray::array![[1.0f32, 2.0, 3.0]])?;
    vardim_array.append(ndarray::array![4.0f32, 5.0])?;
    assert_eq!(
        vardim_array.get_ndarray::<f32>(0)?,
        ndarray::array![[1.0f32, 2.0, 3.0]].into_dyn()
    );
    assert_eq!(vardim_array.get_ndarray::<f32>(1)?.shape(), &[2]);
    Ok(())
}
