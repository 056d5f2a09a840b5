/// Embedded artifacts shipped inside every proof pack: a stdlib-only
/// Python verifier and the reproducibility statement. Both are plain
/// templates; `@PLACEHOLDER@` tokens are substituted at build time.

pub const VERIFY_PY: &str = r#"#!/usr/bin/env python3
"""Standalone proof pack verifier. No external dependencies.

Usage:
    python verify.py

Exit codes: 0 = all checksums match, 1 = mismatch or missing file.
"""

import hashlib
import json
import os
import sys


def file_sha256(path):
    digest = hashlib.sha256()
    with open(path, "rb") as handle:
        for chunk in iter(lambda: handle.read(8192), b""):
            digest.update(chunk)
    return digest.hexdigest()


def main():
    here = os.path.dirname(os.path.abspath(__file__))
    manifest_path = os.path.join(here, "manifest.json")
    if not os.path.exists(manifest_path):
        print("[FAIL] manifest.json not found")
        return 1

    with open(manifest_path, "r", encoding="utf-8") as handle:
        manifest = json.load(handle)

    print("Plan version:", manifest.get("plan_version_id", "unknown"))
    errors = []

    for name, expected in sorted(manifest.get("files", {}).items()):
        path = os.path.join(here, name)
        if not os.path.exists(path):
            print("[FAIL]", name, "- missing")
            errors.append(name)
            continue
        actual = file_sha256(path)
        if actual != expected:
            print("[FAIL]", name, "- checksum mismatch")
            errors.append(name)
        else:
            print("[OK]  ", name)

    audit_path = os.path.join(here, "audit_summary.json")
    if os.path.exists(audit_path):
        with open(audit_path, "r", encoding="utf-8") as handle:
            audit = json.load(handle)
        failing = [c["kind"] for c in audit.get("checks", []) if c.get("status") == "FAIL"]
        if failing:
            print("[WARN] failing audit checks:", ", ".join(failing))

    if errors:
        print()
        print("VERIFICATION FAILED:", len(errors), "file(s)")
        return 1
    print()
    print("VERIFICATION PASSED")
    return 0


if __name__ == "__main__":
    sys.exit(main())
"#;

pub const REPRODUCIBILITY_MD: &str = r#"# Reproducibility Guarantee

## Formal definition

A plan is **reproducible** if and only if:

```
f(input_hash, solver_config_hash, seed) -> output_hash
```

is deterministic: identical inputs always yield the identical output hash.

## Hash definitions

- `input_hash` - SHA-256 over the sorted canonical forecast lines
  (`<day> <HH:MM>-<HH:MM> [Depot <depot>]`).
- `solver_config_hash` - SHA-256 over the key-sorted solver config JSON.
- `output_hash` - SHA-256 over the key-sorted document of sorted assignment
  records bound to `solver_config_hash`.

## This proof pack

| Field | Value |
|-------|-------|
| input_hash | `@INPUT_HASH@` |
| solver_config_hash | `@CONFIG_HASH@` |
| output_hash | `@OUTPUT_HASH@` |
| seed | `@SEED@` |

## Verification

```bash
python verify.py
```

## Archive determinism

Entries are written in lexicographic order with a fixed timestamp
(2026-01-01 00:00:00) and `Stored` (uncompressed) entries. Deflate output
varies across zlib builds, so uncompressed storage is used to keep the
archive bytes reproducible on every platform.

Generated: @GENERATED_AT@
Plan version: @PLAN_VERSION_ID@
"#;
