// SPDX-License-Identifier: Apache-2.0

use serde_yaml::Value;

/// Fold `src` into `dst`:
///  * Mappings are merged key by key, recursively.
///  * Sequences are concatenated, items of `src` appended after `dst`.
///  * A `null` value in a `src` mapping removes the key from `dst`.
///  * Anything else in `src` replaces `dst`.
pub(crate) fn merge_yaml_value(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Mapping(dst), Value::Mapping(src)) => {
            for (src_key, src_value) in src {
                if src_value.is_null() {
                    dst.remove(&src_key);
                } else if let Some(dst_value) = dst.get_mut(&src_key) {
                    merge_yaml_value(dst_value, src_value);
                } else {
                    dst.insert(src_key, src_value);
                }
            }
        }
        (Value::Sequence(dst), Value::Sequence(src)) => {
            dst.extend(src);
        }
        (dst, src) => {
            *dst = src;
        }
    }
}
