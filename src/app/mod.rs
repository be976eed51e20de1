pub mod generic_recipe;
