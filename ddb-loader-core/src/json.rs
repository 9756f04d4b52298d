/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::Value;

/// Maps a JSON document onto the equivalent `AttributeValue` tree.
pub fn json_to_attribute_value(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(a) => {
            AttributeValue::L(a.into_iter().map(json_to_attribute_value).collect())
        }
        Value::Object(o) => AttributeValue::M(
            o.into_iter()
                .map(|(k, v)| (k, json_to_attribute_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_documents() {
        let av = json_to_attribute_value(json!({"a": [1, null, true]}));
        let AttributeValue::M(map) = av else {
            panic!("expected a map");
        };
        assert_eq!(
            map["a"],
            AttributeValue::L(vec![
                AttributeValue::N("1".into()),
                AttributeValue::Null(true),
                AttributeValue::Bool(true),
            ])
        );
    }
}
