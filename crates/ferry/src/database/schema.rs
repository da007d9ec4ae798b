/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

// Timestamps are TEXT columns holding fixed-width RFC 3339 UTC strings.

diesel::table! {
    requests (id) {
        id -> Integer,
        category -> Text,
        identifier -> Text,
        callback_url -> Text,
        payload -> Nullable<Text>,
        status -> Text,
        locked_by -> Nullable<Text>,
        locked_at -> Nullable<Text>,
        created_at -> Text,
        completed_at -> Nullable<Text>,
    }
}

diesel::table! {
    counters (category) {
        category -> Text,
        counter -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(requests, counters);
