/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_sdk_dynamodb::types::AttributeValue;

/// Returns the DynamoDB type descriptor (`S`, `N`, `SS`, ...) of an `AttributeValue`.
pub fn type_name(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::S(_) => "S",
        AttributeValue::N(_) => "N",
        AttributeValue::B(_) => "B",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        AttributeValue::M(_) => "M",
        AttributeValue::L(_) => "L",
        AttributeValue::Null(_) => "NULL",
        AttributeValue::Bool(_) => "BOOL",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_match_dynamodb_names() {
        assert_eq!(type_name(&AttributeValue::S("a".into())), "S");
        assert_eq!(type_name(&AttributeValue::Ns(vec!["1".into()])), "NS");
        assert_eq!(type_name(&AttributeValue::Null(true)), "NULL");
        assert_eq!(type_name(&AttributeValue::Bool(false)), "BOOL");
    }
}
