/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

pub fn get_filename_extension<'a> (path: &'a str) -> Option<&'a str> {
    if let Some(idx) = path.rfind('.') {
        if idx < path.len()-1 {
            return Some( path[idx+1..].as_ref() )
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_extension() {
        assert_eq!(get_filename_extension("scene.tif"), Some("tif"));
        assert_eq!(get_filename_extension("no_extension"), None);
        assert_eq!(get_filename_extension("trailing."), None);
    }
}
