// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Predicate and condition evaluation
//!
//! The matcher treats predicates and conditions as opaque closures behind a
//! single call interface; this module owns those closures, the context they
//! receive and the built-in predicate compiler.

mod condition;
mod context;
mod predicate;

pub use condition::{Condition, ConditionFn};
pub use context::{EvaluationContext, is_truthy};
pub use predicate::{BuiltinPredicateCompiler, Predicate, PredicateCompiler, PredicateFn};
