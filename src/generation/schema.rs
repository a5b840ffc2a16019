//! Strict JSON schemas sent with each structured request.

use serde_json::{json, Value};

use super::provider::ResponseSchema;

fn ingredient() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "quantity": {"type": "number"},
            "unit": {"type": "string"},
            "required": {"type": "boolean"}
        },
        "required": ["name", "quantity", "unit", "required"],
        "additionalProperties": false
    })
}

fn step() -> Value {
    json!({
        "type": "object",
        "properties": {
            "step": {"type": "number"},
            "instruction": {"type": "string"},
            "time_minutes": {"type": "number"}
        },
        "required": ["step", "instruction", "time_minutes"],
        "additionalProperties": false
    })
}

pub fn recompose() -> ResponseSchema {
    ResponseSchema {
        name: "recipe_update",
        schema: json!({
            "type": "object",
            "properties": {
                "ingredients": {"type": "array", "items": ingredient()},
                "steps": {"type": "array", "items": step()},
                "nutrition": {
                    "type": "object",
                    "properties": {
                        "calories": {"type": "number"},
                        "protein": {"type": "number"},
                        "carbs": {"type": "number"},
                        "fat": {"type": "number"},
                        "fiber": {"type": "number"},
                        "sugar": {"type": "number"},
                        "sodium": {"type": "number"}
                    },
                    "required": ["calories", "protein", "carbs", "fat", "fiber", "sugar", "sodium"],
                    "additionalProperties": false
                },
                "cost": {"type": "number"},
                "total_time": {"type": "number"}
            },
            "required": ["ingredients", "steps", "nutrition", "cost", "total_time"],
            "additionalProperties": false
        }),
    }
}

pub fn nutrition_estimate() -> ResponseSchema {
    ResponseSchema {
        name: "nutrition_estimate",
        schema: json!({
            "type": "object",
            "properties": {
                "calories": {"type": "number"},
                "protein_g": {"type": "number"},
                "carbs_g": {"type": "number"},
                "fat_g": {"type": "number"},
                "fiber_g": {"type": "number"},
                "sugar_g": {"type": "number"},
                "sodium_mg": {"type": "number"},
                "category": {"type": "string"},
                "confidence": {"type": "string"}
            },
            "required": ["calories", "protein_g", "carbs_g", "fat_g", "fiber_g",
                         "sugar_g", "sodium_mg", "category", "confidence"],
            "additionalProperties": false
        }),
    }
}

pub fn pantry_scan() -> ResponseSchema {
    ResponseSchema {
        name: "pantry_scan",
        schema: json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "brand": {"type": ["string", "null"]},
                            "category": {"type": "string"},
                            "estimated_quantity": {"type": "number"},
                            "suggested_unit": {"type": "string"},
                            "confidence": {"type": "number"}
                        },
                        "required": ["name", "brand", "category", "estimated_quantity",
                                     "suggested_unit", "confidence"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["items"],
            "additionalProperties": false
        }),
    }
}

pub fn cooking_answer() -> ResponseSchema {
    ResponseSchema {
        name: "cooking_response",
        schema: json!({
            "type": "object",
            "properties": {
                "answer": {"type": "string"},
                "creates_branch": {"type": "boolean"},
                "suggested_modification": {"type": ["string", "null"]}
            },
            "required": ["answer", "creates_branch", "suggested_modification"],
            "additionalProperties": false
        }),
    }
}

pub fn recipe_generation() -> ResponseSchema {
    ResponseSchema {
        name: "recipe_generation",
        schema: json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "description": {"type": "string"},
                "cuisine_type": {"type": "string"},
                "difficulty_level": {"type": "string"},
                "prep_time_minutes": {"type": "number"},
                "cook_time_minutes": {"type": "number"},
                "servings": {"type": "number"},
                "ingredients": {"type": "array", "items": ingredient()},
                "steps": {"type": "array", "items": step()},
                "branch_points": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "step": {"type": "number"},
                            "question": {"type": "string"},
                            "options": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "choice": {"type": "string"},
                                        "description": {"type": "string"}
                                    },
                                    "required": ["choice", "description"],
                                    "additionalProperties": false
                                }
                            }
                        },
                        "required": ["step", "question", "options"],
                        "additionalProperties": false
                    }
                },
                "dietary_tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["name", "description", "cuisine_type", "difficulty_level",
                         "prep_time_minutes", "cook_time_minutes", "servings", "ingredients",
                         "steps", "branch_points", "dietary_tags"],
            "additionalProperties": false
        }),
    }
}
