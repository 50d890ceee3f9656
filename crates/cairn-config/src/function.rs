//! Function artifact types.
//!
//! Only the parts of a function that matter for distribution are typed: the
//! task list and, for tasks that call other functions, their addresses.
//! Everything else (input schema, expressions, output) is carried through
//! untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::{ADDRESS_FIELDS, Address};
use crate::error::ShapeError;

/// A task that invokes a published sub-function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTask {
  #[serde(flatten)]
  pub address: Address,
  /// Remaining task fields (input, skip, map, ...).
  #[serde(flatten)]
  pub body: Map<String, Value>,
}

/// A leaf vector completion task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionTask {
  #[serde(flatten)]
  pub body: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", try_from = "Value")]
pub enum Task {
  #[serde(rename = "scalar.function")]
  ScalarFunction(FunctionTask),
  #[serde(rename = "vector.function")]
  VectorFunction(FunctionTask),
  #[serde(rename = "vector.completion")]
  VectorCompletion(CompletionTask),
}

impl Task {
  /// Address of the sub-function this task calls, if any.
  pub fn reference(&self) -> Option<&Address> {
    match self {
      Task::ScalarFunction(task) | Task::VectorFunction(task) => Some(&task.address),
      Task::VectorCompletion(_) => None,
    }
  }
}

impl TryFrom<Value> for Task {
  type Error = ShapeError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    let mut body = match value {
      Value::Object(object) => object,
      other => return Err(ShapeError::unrecognized_value(&other)),
    };

    let task_type = match body.remove("type") {
      Some(Value::String(task_type)) => task_type,
      _ => return Err(ShapeError::unrecognized(&body)),
    };

    let function_task = |mut body: Map<String, Value>| -> Result<FunctionTask, ShapeError> {
      let address = Address::from_object(&body)?;
      for field in ADDRESS_FIELDS {
        body.remove(field);
      }
      Ok(FunctionTask { address, body })
    };

    match task_type.as_str() {
      "scalar.function" => function_task(body).map(Task::ScalarFunction),
      "vector.function" => function_task(body).map(Task::VectorFunction),
      "vector.completion" => Ok(Task::VectorCompletion(CompletionTask { body })),
      other => Err(ShapeError::UnknownTaskType {
        task_type: other.to_string(),
        payload: Value::Object(body).to_string(),
      }),
    }
  }
}

/// A function artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Function {
  #[serde(flatten)]
  pub metadata: Map<String, Value>,
  pub tasks: Vec<Task>,
}

impl Function {
  /// Parse a serialized function artifact.
  pub fn from_slice(bytes: &[u8]) -> Result<Self, ShapeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    Function::try_from(value)
  }

  /// Addresses of every sub-function this function calls, in task order.
  pub fn references(&self) -> impl Iterator<Item = &Address> {
    self.tasks.iter().filter_map(Task::reference)
  }
}

impl TryFrom<Value> for Function {
  type Error = ShapeError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    let mut metadata = match value {
      Value::Object(object) => object,
      other => return Err(ShapeError::unrecognized_value(&other)),
    };

    let tasks = match metadata.remove("tasks") {
      Some(Value::Array(tasks)) => tasks
        .into_iter()
        .map(Task::try_from)
        .collect::<Result<Vec<_>, _>>()?,
      Some(other) => return Err(ShapeError::unrecognized_value(&other)),
      None => return Err(ShapeError::unrecognized(&metadata)),
    };

    Ok(Function { metadata, tasks })
  }
}
